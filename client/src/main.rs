use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use crossterm::terminal;

fn main() {
    let server_addr = common::net::get_connectable_address();
    let private_key = common::net::private_key();

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
    let socket = match UdpSocket::bind(socket_addr) {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("failed to bind client socket: {}", e);
            std::process::exit(1);
        }
    };

    // Raw mode delivers keystrokes immediately instead of line-buffered.
    if let Err(e) = terminal::enable_raw_mode() {
        eprintln!("failed to enable raw terminal mode: {}", e);
        std::process::exit(1);
    }

    let result = client::run::run_client_loop(socket, server_addr, private_key);

    terminal::disable_raw_mode().ok();

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

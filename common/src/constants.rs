// Server:
pub const TICKS_PER_BROADCAST: u64 = 6; // 10 state broadcasts per second at 60Hz. Raise to 60 to make interpolation visible to the naked eye.
pub const CLOCK_SYNC_INTERVAL_MILLIS: u64 = 50; // 20Hz ServerTime messages.
pub const MAX_PLAYERS: usize = 10;
pub const PACE_KART_ID: u64 = 0; // Reserved vehicle id for the server-driven kart.

// Client:
pub const MAX_UNACKNOWLEDGED_MOVES: usize = 512; // ~8.5s of input at 60Hz; far beyond any sane round trip.

// Arena:
pub const ARENA_HALF_EXTENT: f32 = 200.0; // Metres from the centre to each wall.

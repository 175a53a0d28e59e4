pub mod cpu;
pub mod machine;
mod persist;

pub use machine::Nc1020;
pub use persist::DeviceConfig;

/// Logical LCD width in pixels.
pub const LCD_WIDTH: usize = 160;
/// Logical LCD height in pixels.
pub const LCD_HEIGHT: usize = 80;
/// Bytes copied by `Nc1020::copy_lcd_buffer` (one bit per pixel).
pub const LCD_BUFFER_SIZE: usize = LCD_WIDTH * LCD_HEIGHT / 8;

/// Size of one ROM/NOR bank.
pub const BANK_SIZE: usize = 0x8000;
/// Number of 32 KiB banks in the ROM image.
pub const ROM_BANK_COUNT: usize = 0x300;
/// Number of 32 KiB banks in the NOR flash.
pub const NOR_BANK_COUNT: usize = 0x20;
/// Total ROM image size in bytes (24 MiB).
pub const ROM_SIZE: usize = BANK_SIZE * ROM_BANK_COUNT;
/// Total NOR flash size in bytes (1 MiB).
pub const NOR_SIZE: usize = BANK_SIZE * NOR_BANK_COUNT;
/// Size of the on-board RAM.
pub const RAM_SIZE: usize = 0x8000;

mod bus;
pub(crate) mod clock;

#[cfg(test)]
mod tests;

pub(crate) use bus::DeviceBus;

use anyhow::Result;

use crate::cpu::{flag, Bus, Cpu, RESET_VECTOR};
use crate::persist::{self, DeviceConfig};
use crate::LCD_BUFFER_SIZE;

/// CPU clock rate in cycles per second.
pub const CYCLES_PER_SECOND: u64 = 5_120_000;
/// CPU cycles per emulated millisecond.
pub const CYCLES_PER_MS: u64 = CYCLES_PER_SECOND / 1000;

/// Timer0 fires at 2 Hz; two firings make one wall-clock second.
pub(crate) const TIMER0_PERIOD: u64 = CYCLES_PER_SECOND / 2;
/// Timer1 fires at 256 Hz.
pub(crate) const TIMER1_PERIOD: u64 = CYCLES_PER_SECOND / 0x100;
/// Timer1 period while fast-forward is requested.
pub(crate) const TIMER1_PERIOD_SPEED_UP: u64 = TIMER1_PERIOD / 20;

/// High-level NC1020 machine.
///
/// Holds the CPU core and the device bus, and exposes the host-facing
/// surface: reset, state load/save, key events, time slices and
/// framebuffer copies. All emulation happens synchronously inside
/// `run_time_slice`; the host must not re-enter while a slice runs.
pub struct Nc1020 {
    cpu: Cpu,
    bus: DeviceBus,
    config: DeviceConfig,
}

impl Nc1020 {
    /// Construct a machine with the ROM image loaded and decoded.
    ///
    /// The NOR flash and snapshot files are only touched by `reset` /
    /// `load_state`, so a freshly constructed machine still needs one of
    /// those calls before it can run.
    pub fn new(config: DeviceConfig) -> Result<Self> {
        let rom = persist::load_rom_image(&config.rom_path)?;
        log::info!("loaded ROM image from {}", config.rom_path.display());
        Ok(Self {
            cpu: Cpu::new(),
            bus: DeviceBus::new(rom),
            config,
        })
    }

    /// Reload NOR flash from disk and reinitialize the device.
    pub fn reset(&mut self) -> Result<()> {
        self.bus.nor = persist::load_nor_image(&self.config.nor_flash_path)?;
        self.reset_states();
        Ok(())
    }

    /// Reload NOR flash and restore the device snapshot. A missing or
    /// incompatible snapshot leaves the freshly reset device in place.
    pub fn load_state(&mut self) -> Result<()> {
        self.reset()?;
        if persist::restore_snapshot(&self.config.state_path, &mut self.cpu.regs, &mut self.bus) {
            // The memory map is derived state; rebuild it from the
            // restored control registers.
            self.bus.switch_volume();
            log::info!("restored state from {}", self.config.state_path.display());
        }
        Ok(())
    }

    /// Write NOR flash and the device snapshot back to disk.
    pub fn save_state(&self) -> Result<()> {
        persist::save_nor_image(&self.config.nor_flash_path, &self.bus.nor)?;
        persist::write_snapshot(&self.config.state_path, &self.cpu.regs, &self.bus)?;
        Ok(())
    }

    fn reset_states(&mut self) {
        self.bus.reset();
        self.cpu.regs.reset();
        self.cpu.regs.pc = self.bus.peek_word(RESET_VECTOR);
    }

    /// Advance emulation by `milliseconds` of device time.
    ///
    /// The slice runs whole instructions until the cycle budget is spent,
    /// checking the two timers and pending IRQs between instructions, then
    /// rebases the cycle counters so they never grow without bound.
    pub fn run_time_slice(&mut self, milliseconds: u64, speed_up: bool) {
        let end_cycles = milliseconds * CYCLES_PER_MS;
        while self.bus.cycles < end_cycles {
            let taken = self.cpu.step(&mut self.bus);
            self.bus.cycles += u64::from(taken);
            self.tick_timer0();
            self.deliver_irq();
            self.tick_timer1(speed_up);
        }
        self.bus.cycles -= end_cycles;
        self.bus.timer0_deadline -= end_cycles;
        self.bus.timer1_deadline -= end_cycles;
    }

    /// Timer0 drives the wall clock at 2 Hz: every other firing advances
    /// the RTC, and the countdown alarm is reported through register 0x3D
    /// on full-second firings.
    fn tick_timer0(&mut self) {
        if self.bus.cycles < self.bus.timer0_deadline {
            return;
        }
        self.bus.timer0_deadline += TIMER0_PERIOD;
        self.bus.timer0_toggle = !self.bus.timer0_toggle;
        if !self.bus.timer0_toggle {
            self.bus.clock.advance_time();
        }
        if !self.bus.clock.countdown_reached() || self.bus.timer0_toggle {
            self.bus.ram[0x3D] = 0;
        } else {
            self.bus.ram[0x3D] = 0x20;
            self.bus.clock.flags &= 0xFD;
        }
        self.bus.irq_pending = true;
    }

    fn deliver_irq(&mut self) {
        if self.bus.irq_pending && self.cpu.regs.ps & flag::IRQ_DISABLE == 0 {
            self.bus.irq_pending = false;
            self.bus.cycles += u64::from(self.cpu.interrupt(&mut self.bus));
        }
    }

    /// Timer1 ticks the sub-second counter at 256 Hz and either completes
    /// a pending wake-from-sleep or requests an interrupt.
    fn tick_timer1(&mut self, speed_up: bool) {
        if self.bus.cycles < self.bus.timer1_deadline {
            return;
        }
        self.bus.timer1_deadline += if speed_up {
            TIMER1_PERIOD_SPEED_UP
        } else {
            TIMER1_PERIOD
        };
        self.bus.clock.data[4] = self.bus.clock.data[4].wrapping_add(1);
        if self.bus.should_wake_up {
            self.bus.should_wake_up = false;
            self.bus.ram[0x01] |= 0x01;
            self.bus.ram[0x02] |= 0x01;
            self.cpu.regs.pc = self.bus.peek_word(RESET_VECTOR);
        } else {
            self.bus.ram[0x01] |= 0x08;
            self.bus.irq_pending = true;
        }
    }

    /// Update the keypad matrix from a host key event.
    ///
    /// `key_id` encodes row = id mod 8 and column = id div 8. Key 0x0F is
    /// the power key: it toggles sleep when awake and uses the row-7
    /// sentinel mask. While asleep, keys 0x08-0x0F (except 0x0E) wake the
    /// device, leaving a remapped wake key code for the firmware to pick
    /// up.
    pub fn set_key(&mut self, key_id: u8, down: bool) {
        assert!(key_id < 0x40, "invalid key id {key_id:#04X}");
        let row = usize::from(key_id % 8);
        let bits = if key_id == 0x0F {
            0xFE
        } else {
            1 << (key_id / 8)
        };
        if down {
            self.bus.keypad[row] |= bits;
        } else {
            self.bus.keypad[row] &= !bits;
        }

        if !down {
            return;
        }
        if self.bus.slept {
            if (0x08..=0x0F).contains(&key_id) && key_id != 0x0E {
                self.bus.wake_key = match key_id {
                    0x09 => 0x0A,
                    0x0A => 0x08,
                    0x0B => 0x06,
                    0x0C => 0x04,
                    0x0D => 0x02,
                    _ => 0x00,
                };
                self.bus.should_wake_up = true;
                self.bus.wake_pending = true;
                self.bus.slept = false;
            }
        } else if key_id == 0x0F {
            self.bus.slept = true;
        }
    }

    /// Copy the 1600-byte framebuffer region into `buffer`.
    ///
    /// Returns `false` while the firmware has not latched an LCD address
    /// yet. `buffer` must hold at least `LCD_BUFFER_SIZE` bytes.
    pub fn copy_lcd_buffer(&self, buffer: &mut [u8]) -> bool {
        if self.bus.lcd_addr == 0 {
            return false;
        }
        let start = usize::from(self.bus.lcd_addr);
        let Some(frame) = self.bus.ram.get(start..start + LCD_BUFFER_SIZE) else {
            return false;
        };
        buffer[..LCD_BUFFER_SIZE].copy_from_slice(frame);
        true
    }

    /// Test-only constructor working on in-memory images, so fixtures can
    /// run without touching the filesystem.
    #[cfg(test)]
    pub(crate) fn with_images(rom: Vec<u8>, nor: Vec<u8>) -> Self {
        let config = DeviceConfig::builder()
            .rom_path("rom.bin")
            .nor_flash_path("nor.bin")
            .state_path("nc1020.sts")
            .build();
        let mut machine = Self {
            cpu: Cpu::new(),
            bus: DeviceBus::new(rom),
            config,
        };
        machine.bus.nor = nor;
        machine.reset_states();
        machine
    }
}

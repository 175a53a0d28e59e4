use crate::cpu::Bus;
use crate::{BANK_SIZE, NOR_BANK_COUNT, NOR_SIZE, RAM_SIZE};

use super::clock::Clock;
use super::{TIMER0_PERIOD, TIMER1_PERIOD};

mod flash;
mod mmio;

pub(crate) use flash::{FlashProgrammer, FLASH_STATUS_READY};
pub(crate) use mmio::Waveform;

/// Size of one memory window (and one RAM page).
pub(crate) const PAGE_SIZE: usize = 0x2000;
/// Addresses below this dispatch to the I/O register tables.
const IO_LIMIT: u16 = 0x40;

/// ROM region bases (in banks) for the three volumes.
///
/// Volume 1 selects the third region of the ROM image; volume 2 has no
/// region of its own and resolves like volume 0.
const VOLUME0_BASE: usize = 0x000;
const VOLUME1_BASE: usize = 0x200;
const VOLUME2_BASE: usize = 0x000;

/// One 8 KiB slice of the CPU address space, resolved to its backing
/// storage by index rather than by pointer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Window {
    /// RAM page 0-3.
    Ram(usize),
    /// Quarter of a 32 KiB ROM bank; `offset` is the quarter's base.
    Rom { bank: usize, offset: usize },
    /// Quarter of a 32 KiB NOR flash bank.
    Nor { bank: usize, offset: usize },
}

/// A 32 KiB bank selected by the bank-select register.
#[derive(Clone, Copy)]
enum BankRef {
    Rom(usize),
    Nor(usize),
}

/// The whole mutable device: memory images, the resolved memory map and
/// every peripheral register. Owned by the machine and handed to the CPU
/// as its bus.
pub(crate) struct DeviceBus {
    pub(crate) rom: Vec<u8>,
    pub(crate) nor: Vec<u8>,
    pub(crate) ram: [u8; RAM_SIZE],
    windows: [Window; 8],
    bbs_pages: [Window; 16],
    pub(crate) bak40: [u8; 0x40],
    pub(crate) clock: Clock,
    pub(crate) wav: Waveform,
    pub(crate) flash: FlashProgrammer,
    pub(crate) slept: bool,
    pub(crate) should_wake_up: bool,
    pub(crate) wake_pending: bool,
    pub(crate) wake_key: u8,
    pub(crate) timer0_toggle: bool,
    pub(crate) cycles: u64,
    pub(crate) timer0_deadline: u64,
    pub(crate) timer1_deadline: u64,
    pub(crate) irq_pending: bool,
    pub(crate) lcd_addr: u16,
    pub(crate) keypad: [u8; 8],
}

impl DeviceBus {
    pub(crate) fn new(rom: Vec<u8>) -> Self {
        let mut bus = Self {
            rom,
            nor: vec![0; NOR_SIZE],
            ram: [0; RAM_SIZE],
            windows: [Window::Ram(0); 8],
            bbs_pages: [Window::Ram(0); 16],
            bak40: [0; 0x40],
            clock: Clock::new(),
            wav: Waveform::new(),
            flash: FlashProgrammer::new(),
            slept: false,
            should_wake_up: false,
            wake_pending: false,
            wake_key: 0,
            timer0_toggle: false,
            cycles: 0,
            timer0_deadline: TIMER0_PERIOD,
            timer1_deadline: TIMER1_PERIOD,
            irq_pending: false,
            lcd_addr: 0,
            keypad: [0; 8],
        };
        bus.switch_volume();
        bus
    }

    /// Reinitialize everything a device reset touches. The LCD latch, the
    /// sleep flag, the scratch-bank backup and the flash programmer's
    /// command bytes survive a reset, as on the hardware.
    pub(crate) fn reset(&mut self) {
        self.ram = [0; RAM_SIZE];
        self.windows[0] = Window::Ram(0);
        self.switch_volume();

        self.keypad = [0; 8];
        self.clock.reset();
        self.timer0_toggle = false;

        self.wav.data = [0; 0x20];
        self.wav.flags = 0;
        self.wav.index = 0;

        self.should_wake_up = false;
        self.wake_pending = false;

        self.flash.staging = [0; 0x100];
        self.flash.step = 0;

        self.irq_pending = false;
        self.cycles = 0;
        self.timer0_deadline = TIMER0_PERIOD;
        self.timer1_deadline = TIMER1_PERIOD;
    }

    /// Resolve a bank-select value to a 32 KiB unit: the low indices are
    /// NOR flash banks, the rest select a ROM bank through the active
    /// volume.
    fn resolve_bank(&self, bank_idx: u8) -> BankRef {
        if usize::from(bank_idx) < NOR_BANK_COUNT {
            BankRef::Nor(usize::from(bank_idx))
        } else {
            let volume_idx = self.ram[0x0D];
            let base = if volume_idx & 0x01 != 0 {
                VOLUME1_BASE
            } else if volume_idx & 0x02 != 0 {
                VOLUME2_BASE
            } else {
                VOLUME0_BASE
            };
            BankRef::Rom(base + usize::from(bank_idx))
        }
    }

    /// Recompute windows 2-5 from the bank-select register.
    pub(crate) fn switch_bank(&mut self) {
        let bank = self.resolve_bank(self.ram[0x00]);
        for quarter in 0..4 {
            let offset = quarter * PAGE_SIZE;
            self.windows[2 + quarter] = match bank {
                BankRef::Rom(bank) => Window::Rom { bank, offset },
                BankRef::Nor(bank) => Window::Nor { bank, offset },
            };
        }
    }

    /// Recompute the BBS page table and windows 1, 6 and 7 from the
    /// volume-select and ROA/BBS registers, then re-derive the bank
    /// windows.
    pub(crate) fn switch_volume(&mut self) {
        let base = match self.ram[0x0D] & 0x03 {
            0x01 => VOLUME1_BASE,
            0x03 => VOLUME2_BASE,
            _ => VOLUME0_BASE,
        };
        for (i, page) in self.bbs_pages.iter_mut().enumerate() {
            *page = Window::Rom {
                bank: base + i / 4,
                offset: (i % 4) * PAGE_SIZE,
            };
        }
        self.bbs_pages[1] = Window::Ram(3);
        self.windows[7] = Window::Rom {
            bank: base,
            offset: PAGE_SIZE,
        };
        let roa_bbs = self.ram[0x0A];
        self.windows[1] = if roa_bbs & 0x04 != 0 {
            Window::Ram(2)
        } else {
            Window::Ram(1)
        };
        self.windows[6] = self.bbs_pages[usize::from(roa_bbs & 0x0F)];
        self.switch_bank();
    }

    fn window_read(&self, window: Window, offset: usize) -> u8 {
        match window {
            Window::Ram(page) => self.ram[page * PAGE_SIZE + offset],
            Window::Rom { bank, offset: base } => self.rom[bank * BANK_SIZE + base + offset],
            Window::Nor { bank, offset: base } => self.nor[bank * BANK_SIZE + base + offset],
        }
    }

    #[cfg(test)]
    pub(crate) fn window(&self, index: usize) -> Window {
        self.windows[index]
    }
}

impl Bus for DeviceBus {
    fn peek(&self, addr: u16) -> u8 {
        let window = self.windows[usize::from(addr >> 13)];
        self.window_read(window, usize::from(addr & 0x1FFF))
    }

    fn load(&mut self, addr: u16) -> u8 {
        if addr < IO_LIMIT {
            return self.io_read(addr as u8);
        }
        if (0x4000..0xC000).contains(&addr) && self.flash.status_read_pending() {
            self.flash.step = 0;
            return FLASH_STATUS_READY;
        }
        if addr == 0x045F && self.wake_pending {
            // The firmware's wake handler reads the key code the wake-up
            // event left behind at this RAM location.
            self.wake_pending = false;
            self.ram[0x045F] = self.wake_key;
        }
        self.peek(addr)
    }

    fn store(&mut self, addr: u16, value: u8) {
        if addr < IO_LIMIT {
            self.io_write(addr as u8, value);
            return;
        }
        if addr < 0x4000 {
            // Windows 0 and 1 always resolve to RAM.
            if let Window::Ram(page) = self.windows[usize::from(addr >> 13)] {
                self.ram[page * PAGE_SIZE + usize::from(addr & 0x1FFF)] = value;
            }
            return;
        }
        if let Window::Ram(page @ 2..=3) = self.windows[usize::from(addr >> 13)] {
            self.ram[page * PAGE_SIZE + usize::from(addr & 0x1FFF)] = value;
            return;
        }
        if addr >= 0xE000 {
            // ROM is immutable.
            return;
        }
        self.flash_write(addr, value);
    }

    fn stack_read(&self, offset: u8) -> u8 {
        self.ram[0x100 + usize::from(offset)]
    }

    fn stack_write(&mut self, offset: u8, value: u8) {
        self.ram[0x100 + usize::from(offset)] = value;
    }
}

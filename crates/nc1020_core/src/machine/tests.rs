use super::bus::Window;
use super::Nc1020;
use crate::cpu::Bus;
use crate::persist;
use crate::{NOR_SIZE, ROM_SIZE};

/// Machine with an all-zero ROM image (opcode 0x00 = BRK everywhere), a
/// blank 0xFF flash and the reset vector pointing at 0x1234.
fn test_machine() -> Nc1020 {
    let mut rom = vec![0u8; ROM_SIZE];
    rom[0x3FFC] = 0x34;
    rom[0x3FFD] = 0x12;
    Nc1020::with_images(rom, vec![0xFF; NOR_SIZE])
}

fn unlock_flash(machine: &mut Nc1020) {
    machine.bus.store(0x5555, 0xAA);
    machine.bus.store(0xAAAA, 0x55);
}

#[test]
fn reset_loads_registers_and_reset_vector() {
    let machine = test_machine();
    assert_eq!(machine.cpu.regs.pc, 0x1234);
    assert_eq!(machine.cpu.regs.ps, 0x24);
    assert_eq!(machine.cpu.regs.sp, 0xFF);
    assert_eq!(machine.cpu.regs.a, 0);
}

#[test]
fn reset_window_layout() {
    let machine = test_machine();
    assert_eq!(machine.bus.window(0), Window::Ram(0));
    assert_eq!(machine.bus.window(1), Window::Ram(1));
    for quarter in 0..4 {
        assert_eq!(
            machine.bus.window(2 + quarter),
            Window::Nor {
                bank: 0,
                offset: quarter * 0x2000
            }
        );
    }
    assert_eq!(machine.bus.window(6), Window::Rom { bank: 0, offset: 0 });
    assert_eq!(
        machine.bus.window(7),
        Window::Rom {
            bank: 0,
            offset: 0x2000
        }
    );
}

#[test]
fn bank_select_remaps_the_four_middle_windows() {
    let mut machine = test_machine();

    machine.bus.store(0x00, 0x01);
    assert_eq!(
        machine.bus.window(2),
        Window::Nor {
            bank: 1,
            offset: 0
        }
    );

    machine.bus.store(0x00, 0x80);
    assert_eq!(
        machine.bus.window(2),
        Window::Rom {
            bank: 0x80,
            offset: 0
        }
    );
    assert_eq!(
        machine.bus.window(5),
        Window::Rom {
            bank: 0x80,
            offset: 0x6000
        }
    );
}

#[test]
fn volume_select_redirects_rom_banks() {
    let mut machine = test_machine();
    machine.bus.store(0x00, 0x80);

    // Volume 1 lives in the third ROM region.
    machine.bus.store(0x0D, 0x01);
    assert_eq!(
        machine.bus.window(2),
        Window::Rom {
            bank: 0x280,
            offset: 0
        }
    );
    assert_eq!(
        machine.bus.window(7),
        Window::Rom {
            bank: 0x200,
            offset: 0x2000
        }
    );

    // Volume 2 has no region of its own and resolves like volume 0.
    machine.bus.store(0x0D, 0x02);
    assert_eq!(
        machine.bus.window(2),
        Window::Rom {
            bank: 0x80,
            offset: 0
        }
    );
}

#[test]
fn roa_bbs_register_redirects_window_6() {
    let mut machine = test_machine();

    // Entry 1 of the BBS page table is RAM page 3.
    machine.bus.store(0x0A, 0x01);
    assert_eq!(machine.bus.window(6), Window::Ram(3));
    machine.bus.store(0xC123, 0x77);
    assert_eq!(machine.bus.ram[0x6123], 0x77);

    machine.bus.store(0x0A, 0x06);
    assert_eq!(
        machine.bus.window(6),
        Window::Rom {
            bank: 1,
            offset: 0x4000
        }
    );
}

#[test]
fn keypad_scan_reports_selected_row() {
    let mut machine = test_machine();
    machine.set_key(0x09, true); // row 1, column 1

    machine.bus.store(0x09, 0x02);
    assert_eq!(machine.bus.load(0x08), 0x02);

    machine.set_key(0x09, false);
    machine.bus.store(0x09, 0x02);
    assert_eq!(machine.bus.load(0x08), 0x00);
}

#[test]
fn keypad_scan_zero_latches_released_status() {
    let mut machine = test_machine();
    machine.bus.store(0x09, 0x00);
    assert_eq!(machine.bus.ram[0x0B] & 0x01, 0x01);
}

#[test]
fn keypad_any_key_scan_ors_all_rows() {
    let mut machine = test_machine();
    machine.set_key(0x00, true); // row 0, column 0
    machine.set_key(0x1A, true); // row 2, column 3
    machine.bus.store(0x15, 0x7F);
    machine.bus.store(0x09, 0x7F);
    assert_eq!(machine.bus.load(0x08), 0x01 | 0x08);
}

#[test]
fn flash_chip_erase_blanks_every_bank() {
    let mut machine = test_machine();
    machine.bus.nor.fill(0x00);

    unlock_flash(&mut machine);
    machine.bus.store(0x5555, 0x80);
    unlock_flash(&mut machine);
    machine.bus.store(0x5555, 0x10);

    assert!(machine.bus.nor.iter().all(|&b| b == 0xFF));
}

#[test]
fn flash_byte_program_ands_byte_and_reports_status() {
    let mut machine = test_machine();

    unlock_flash(&mut machine);
    machine.bus.store(0x5555, 0xA0);
    machine.bus.store(0x4100, 0x12);
    assert_eq!(machine.bus.nor[0x100], 0x12);

    // The next read in the flash window reports ready status exactly once.
    assert_eq!(machine.bus.load(0x5000), 0x88);
    assert_eq!(machine.bus.flash.step, 0);
    assert_eq!(machine.bus.load(0x5000), 0xFF);
}

#[test]
fn flash_sector_erase_clears_one_block() {
    let mut machine = test_machine();
    machine.bus.nor.fill(0x00);

    unlock_flash(&mut machine);
    machine.bus.store(0x5555, 0x80);
    unlock_flash(&mut machine);
    machine.bus.store(0x4800, 0x30);

    assert!(machine.bus.nor[0x800..0x1000].iter().all(|&b| b == 0xFF));
    assert!(machine.bus.nor[..0x800].iter().all(|&b| b == 0x00));
    assert!(machine.bus.nor[0x1000..0x2000].iter().all(|&b| b == 0x00));
}

#[test]
fn flash_abort_returns_to_idle() {
    let mut machine = test_machine();
    machine.bus.store(0x5555, 0xAA);
    assert_eq!(machine.bus.flash.step, 1);
    machine.bus.store(0x8000, 0xF0);
    assert_eq!(machine.bus.flash.step, 0);
}

#[test]
fn flash_sequence_needs_a_nor_bank_selected() {
    let mut machine = test_machine();
    machine.bus.store(0x00, 0x80); // ROM bank mapped
    machine.bus.store(0x5555, 0xAA);
    assert_eq!(machine.bus.flash.step, 0);
}

#[test]
fn stores_above_e000_are_discarded() {
    let mut machine = test_machine();
    let before = machine.bus.peek(0xE123);
    machine.bus.store(0xE123, 0x55);
    assert_eq!(machine.bus.peek(0xE123), before);
    assert_eq!(machine.bus.flash.step, 0);
}

#[test]
fn rtc_seconds_roll_into_minutes_hours_and_days() {
    let mut machine = test_machine();
    let clock = &mut machine.bus.clock;
    clock.data[0] = 59;
    clock.data[1] = 59;
    clock.data[2] = 23;
    clock.data[3] = 6;

    clock.advance_time();
    assert_eq!(clock.data[0], 0);
    assert_eq!(clock.data[1], 0);
    assert_eq!(clock.data[2], 0);
    assert_eq!(clock.data[3], 7);
}

#[test]
fn rtc_hour_byte_keeps_top_bits_on_day_rollover() {
    let mut machine = test_machine();
    let clock = &mut machine.bus.clock;
    clock.data[0] = 59;
    clock.data[1] = 59;
    clock.data[2] = 0xC0 | 23;

    clock.advance_time();
    assert_eq!(clock.data[2], 0xC0);
    assert_eq!(clock.data[3], 1);
}

#[test]
fn countdown_alarm_requires_enable_bits_and_a_match() {
    let mut machine = test_machine();
    let clock = &mut machine.bus.clock;
    clock.data[0] = 30;
    clock.data[5] = 0x80 | 30;
    clock.data[10] = 0x02;

    assert!(!clock.countdown_reached());
    clock.flags = 0x02;
    assert!(clock.countdown_reached());

    clock.data[5] = 0x80 | 31;
    assert!(!clock.countdown_reached());
}

#[test]
fn rtc_write_protect_gates_time_registers() {
    let mut machine = test_machine();
    machine.bus.clock.data[0x0B] = 0x80;
    machine.bus.store(0x3E, 0x00);
    machine.bus.store(0x3F, 33);
    assert_eq!(machine.bus.clock.data[0], 0);

    // Clearing the protect bit goes through the same indexed port; only
    // bit 7 of register 0x0B is writable.
    machine.bus.store(0x3E, 0x0B);
    machine.bus.store(0x3F, 0x55);
    assert_eq!(machine.bus.clock.data[0x0B], 0x00);

    machine.bus.store(0x3E, 0x00);
    machine.bus.store(0x3F, 33);
    assert_eq!(machine.bus.clock.data[0], 33);
}

#[test]
fn indexed_rtc_read_returns_zero_out_of_range() {
    let mut machine = test_machine();
    machine.bus.clock.data[4] = 0x99;
    machine.bus.store(0x3E, 0x04);
    assert_eq!(machine.bus.load(0x3F), 0x99);
    machine.bus.store(0x3E, 80);
    assert_eq!(machine.bus.load(0x3F), 0);
}

#[test]
fn timer1_raises_interrupt_flag_and_subsecond_tick() {
    let mut machine = test_machine();
    // The zeroed address space executes an endless BRK loop, which is
    // enough to burn cycles through the slice.
    machine.run_time_slice(5, false);
    assert_ne!(machine.bus.ram[0x01] & 0x08, 0);
    assert!(machine.bus.clock.data[4] > 0);
    // The slice rebases the cycle counters on its way out.
    assert!(machine.bus.cycles < 32);
}

#[test]
fn speed_up_multiplies_timer1_rate() {
    let mut normal = test_machine();
    normal.run_time_slice(20, false);
    let mut fast = test_machine();
    fast.run_time_slice(20, true);
    assert!(fast.bus.clock.data[4] >= normal.bus.clock.data[4] * 10);
}

#[test]
fn power_key_toggles_sleep_and_wake_key_is_injected() {
    let mut machine = test_machine();

    machine.set_key(0x0F, true);
    assert!(machine.bus.slept);
    machine.set_key(0x0F, false);

    machine.set_key(0x09, true);
    assert!(!machine.bus.slept);
    assert!(machine.bus.should_wake_up);
    assert!(machine.bus.wake_pending);

    machine.run_time_slice(5, false);
    assert_ne!(machine.bus.ram[0x01] & 0x01, 0);
    assert_ne!(machine.bus.ram[0x02] & 0x01, 0);

    // The wake handler's first read of 0x45F sees the remapped key code.
    assert_eq!(machine.bus.load(0x045F), 0x0A);
    assert!(!machine.bus.wake_pending);
    assert_eq!(machine.bus.load(0x045F), 0x0A); // now plain RAM
}

#[test]
fn sleep_follows_power_control_bit() {
    let mut machine = test_machine();
    machine.bus.store(0x05, 0x08);
    assert!(!machine.bus.slept);
    machine.bus.store(0x05, 0x00);
    assert!(machine.bus.slept);
}

#[test]
fn zp40_swap_banks_scratch_memory() {
    let mut machine = test_machine();
    machine.bus.ram[0x40..0x80].fill(0xAA);

    machine.bus.store(0x0F, 0x05);
    assert_eq!(machine.bus.bak40, [0xAA; 0x40]);
    assert!(machine.bus.ram[0x40..0x80].iter().all(|&b| b == 0));

    machine.bus.ram[0x40] = 0x11;
    machine.bus.store(0x0F, 0x00);
    // Slot 5 keeps the modified window; the backup is restored.
    assert_eq!(machine.bus.ram[0x140], 0x11);
    assert!(machine.bus.ram[0x41..0x80].iter().all(|&b| b == 0xAA));
    assert_eq!(machine.bus.ram[0x40], 0xAA);
}

#[test]
fn lcd_address_latches_once_and_copies() {
    let mut machine = test_machine();
    let mut buffer = [0u8; crate::LCD_BUFFER_SIZE];
    assert!(!machine.copy_lcd_buffer(&mut buffer));

    machine.bus.store(0x0C, 0x02);
    machine.bus.store(0x06, 0x34);
    assert_eq!(machine.bus.lcd_addr, 0x2340);

    // Further writes do not move the latched address.
    machine.bus.store(0x06, 0x55);
    assert_eq!(machine.bus.lcd_addr, 0x2340);

    for (i, byte) in machine.bus.ram[0x2340..0x2340 + buffer.len()]
        .iter_mut()
        .enumerate()
    {
        *byte = i as u8;
    }
    assert!(machine.copy_lcd_buffer(&mut buffer));
    assert_eq!(buffer[0], 0);
    assert_eq!(buffer[255], 255);
    assert_eq!(buffer[1599], 1599u16 as u8);
}

#[test]
fn snapshot_round_trips_device_state() {
    let mut machine = test_machine();
    machine.cpu.regs.pc = 0xBEEF;
    machine.cpu.regs.a = 0x42;
    machine.bus.ram[0x2000] = 0x77;
    machine.bus.clock.data[4] = 9;
    machine.bus.flash.staging[0xFF] = 0x5A;
    machine.bus.keypad[3] = 0x10;
    machine.bus.lcd_addr = 0x2340;
    machine.bus.cycles = 1234;

    let data = persist::encode_snapshot(&machine.cpu.regs, &machine.bus);
    assert_eq!(data.len(), persist::SNAPSHOT_SIZE);

    let mut restored = test_machine();
    assert!(persist::decode_snapshot(
        &data,
        &mut restored.cpu.regs,
        &mut restored.bus
    ));
    assert_eq!(restored.cpu.regs.pc, 0xBEEF);
    assert_eq!(restored.cpu.regs.a, 0x42);
    assert_eq!(restored.bus.ram[0x2000], 0x77);
    assert_eq!(restored.bus.clock.data[4], 9);
    assert_eq!(restored.bus.flash.staging[0xFF], 0x5A);
    assert_eq!(restored.bus.keypad[3], 0x10);
    assert_eq!(restored.bus.lcd_addr, 0x2340);
    assert_eq!(restored.bus.cycles, 1234);
}

#[test]
fn snapshot_with_wrong_version_is_rejected_before_applying() {
    let machine = test_machine();
    let mut data = persist::encode_snapshot(&machine.cpu.regs, &machine.bus);
    data[0] ^= 0xFF;

    let mut target = test_machine();
    target.cpu.regs.a = 0x11;
    assert!(!persist::decode_snapshot(
        &data,
        &mut target.cpu.regs,
        &mut target.bus
    ));
    assert_eq!(target.cpu.regs.a, 0x11);
}

#[test]
fn truncated_snapshot_is_rejected() {
    let machine = test_machine();
    let data = persist::encode_snapshot(&machine.cpu.regs, &machine.bus);
    let mut target = test_machine();
    assert!(!persist::decode_snapshot(
        &data[..data.len() - 1],
        &mut target.cpu.regs,
        &mut target.bus
    ));
}

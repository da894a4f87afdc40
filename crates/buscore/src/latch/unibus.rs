//! UNIBUS backplane wire table.
//!
//! Differs from QBUS in naming (MSYN/SSYN instead of SYNC/RPLY, BR/BG/NPR/NPG
//! instead of IRQ/DMR/IAK/DMG), in inverting BG/NPG grant-chain outputs, and
//! in where the power/INIT signals live (register 7 instead of register 5).

use super::wire::{Direction, RegisterInfo, WireInfo, WireTable};
use crate::constants::LATCH_REGISTER_COUNT;

pub struct Unibus;

macro_rules! wire {
    ($reg:literal, $bit:literal, $dir:expr, $inv:literal, $name:literal, $trace:literal) => {
        WireInfo { register: $reg, bit: $bit, direction: $dir, inverted: $inv, name: $name, trace: $trace }
    };
}

static WIRES: &[WireInfo] = &[
    wire!(0, 0, Direction::Out, true, "BG4", "grant-chain out, inverting driver"),
    wire!(0, 1, Direction::Out, true, "BG5", "grant-chain out, inverting driver"),
    wire!(0, 2, Direction::Out, true, "BG6", "grant-chain out, inverting driver"),
    wire!(0, 3, Direction::Out, true, "BG7", "grant-chain out, inverting driver"),
    wire!(0, 4, Direction::Out, true, "NPG", "grant-chain out, inverting driver"),
    wire!(0, 0, Direction::In, false, "BG4", "grant-chain in"),
    wire!(0, 1, Direction::In, false, "BG5", "grant-chain in"),
    wire!(0, 2, Direction::In, false, "BG6", "grant-chain in"),
    wire!(0, 3, Direction::In, false, "BG7", "grant-chain in"),
    wire!(0, 4, Direction::In, false, "NPG", "grant-chain in"),
    wire!(0, 5, Direction::In, false, "LTC", "line time clock, not part of bus protocol"),
    wire!(1, 0, Direction::Out, false, "BR4", "priority request out"),
    wire!(1, 1, Direction::Out, false, "BR5", "priority request out"),
    wire!(1, 2, Direction::Out, false, "BR6", "priority request out"),
    wire!(1, 3, Direction::Out, false, "BR7", "priority request out"),
    wire!(1, 4, Direction::Out, false, "NPR", "DMA request out"),
    wire!(1, 5, Direction::Out, false, "SACK", "selection acknowledge out"),
    wire!(1, 0, Direction::In, false, "BR4", "priority request in"),
    wire!(1, 1, Direction::In, false, "BR5", "priority request in"),
    wire!(1, 2, Direction::In, false, "BR6", "priority request in"),
    wire!(1, 3, Direction::In, false, "BR7", "priority request in"),
    wire!(1, 4, Direction::In, false, "NPR", "DMA request in"),
    wire!(1, 5, Direction::In, false, "SACK", "selection acknowledge in"),
    wire!(4, 2, Direction::Out, false, "C0", "data-cycle control bit 0"),
    wire!(4, 3, Direction::Out, false, "C1", "data-cycle control bit 1"),
    wire!(4, 4, Direction::Out, false, "MSYN", "master sync"),
    wire!(4, 5, Direction::Out, false, "SSYN", "slave sync (reply)"),
    wire!(4, 2, Direction::In, false, "C0", "data-cycle control bit 0 readback"),
    wire!(4, 3, Direction::In, false, "C1", "data-cycle control bit 1 readback"),
    wire!(4, 4, Direction::In, false, "MSYN", "master sync readback"),
    wire!(4, 5, Direction::In, false, "SSYN", "slave sync readback"),
    wire!(7, 0, Direction::Out, false, "INTR", "interrupt vector cycle strobe"),
    wire!(7, 1, Direction::Out, false, "PA", "parity A"),
    wire!(7, 2, Direction::Out, false, "PB", "parity B"),
    wire!(7, 3, Direction::Out, false, "INIT", "bus reset"),
    wire!(7, 4, Direction::Out, false, "ACLO", "AC power loss"),
    wire!(7, 5, Direction::Out, false, "DCLO", "DC power loss"),
    wire!(7, 0, Direction::In, false, "INTR", "interrupt vector cycle strobe readback"),
    wire!(7, 1, Direction::In, false, "PA", "parity A readback"),
    wire!(7, 2, Direction::In, false, "PB", "parity B readback"),
    wire!(7, 3, Direction::In, false, "INIT", "bus reset readback"),
    wire!(7, 4, Direction::In, false, "ACLO", "AC power loss readback"),
    wire!(7, 5, Direction::In, false, "DCLO", "DC power loss readback"),
];

impl WireTable for Unibus {
    const REGISTERS: [RegisterInfo; LATCH_REGISTER_COUNT] = [
        RegisterInfo { valid_mask: 0x3f, testable_mask: 0x1f, inverted_mask: 0x0f }, // BG/NPG chain + LTC
        RegisterInfo { valid_mask: 0x3f, testable_mask: 0x3f, inverted_mask: 0 },    // BR4-7,NPR,SACK
        RegisterInfo::EMPTY,
        RegisterInfo::EMPTY,
        RegisterInfo { valid_mask: 0x3c, testable_mask: 0x3c, inverted_mask: 0 }, // C0,C1,MSYN,SSYN
        RegisterInfo::EMPTY,
        RegisterInfo::EMPTY,
        RegisterInfo { valid_mask: 0x3f, testable_mask: 0x3f, inverted_mask: 0 }, // INTR,PA,PB,INIT,ACLO,DCLO
    ];

    fn wires() -> &'static [WireInfo] {
        WIRES
    }
}

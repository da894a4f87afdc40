//! QBUS backplane wire table.
//!
//! Register/bit assignments follow the QBone CPLD mapping: register 0/1
//! carry DAL<7:0>/DAL<15:8>, register 2 carries DAL<21:16>/BS7*/SYNC,
//! register 4 carries the data-cycle control lines, register 5 the
//! power/INIT signals, and register 6 the interrupt/DMA request-grant-SACK
//! lines.

use super::wire::{Direction, RegisterInfo, WireInfo, WireTable};
use crate::constants::LATCH_REGISTER_COUNT;

pub struct Qbus;

macro_rules! wire {
    ($reg:literal, $bit:literal, $dir:expr, $inv:literal, $name:literal, $trace:literal) => {
        WireInfo { register: $reg, bit: $bit, direction: $dir, inverted: $inv, name: $name, trace: $trace }
    };
}

static WIRES: &[WireInfo] = &[
    wire!(4, 0, Direction::Out, false, "SYNC", "PRU1 control latch -> BSYNC"),
    wire!(4, 1, Direction::Out, false, "DIN", "PRU1 control latch -> BDIN"),
    wire!(4, 2, Direction::Out, false, "DOUT", "PRU1 control latch -> BDOUT"),
    wire!(4, 3, Direction::Out, false, "RPLY", "PRU1 control latch -> BRPLY"),
    wire!(4, 4, Direction::Out, false, "WTBT", "PRU1 control latch -> BWTBT"),
    wire!(4, 5, Direction::Out, false, "BS7", "PRU1 control latch -> BBS7"),
    wire!(4, 6, Direction::Out, false, "REF", "PRU1 control latch -> BREF, block-mode continue"),
    wire!(4, 0, Direction::In, false, "SYNC", "BSYNC -> PRU1 control latch readback"),
    wire!(4, 1, Direction::In, false, "DIN", "BDIN -> PRU1 control latch readback"),
    wire!(4, 2, Direction::In, false, "DOUT", "BDOUT -> PRU1 control latch readback"),
    wire!(4, 3, Direction::In, false, "RPLY", "BRPLY -> PRU1 control latch readback"),
    wire!(4, 4, Direction::In, false, "WTBT", "BWTBT -> PRU1 control latch readback"),
    wire!(4, 5, Direction::In, false, "BS7", "BBS7 -> PRU1 control latch readback"),
    wire!(4, 6, Direction::In, false, "REF", "BREF -> PRU1 control latch readback"),
    wire!(5, 0, Direction::Out, false, "INIT", "PRU1 system latch -> BINIT"),
    wire!(5, 3, Direction::Out, false, "POK", "PRU1 system latch -> BPOK"),
    wire!(5, 4, Direction::Out, false, "DCOK", "PRU1 system latch -> BDCOK"),
    wire!(5, 0, Direction::In, false, "INIT", "BINIT -> PRU1 system latch readback"),
    wire!(5, 3, Direction::In, false, "POK", "BPOK -> PRU1 system latch readback"),
    wire!(5, 4, Direction::In, false, "DCOK", "BDCOK -> PRU1 system latch readback"),
    wire!(6, 0, Direction::Out, false, "IRQ4", "PRU1 intr/dma latch -> BIRQ4"),
    wire!(6, 1, Direction::Out, false, "IRQ5", "PRU1 intr/dma latch -> BIRQ5"),
    wire!(6, 2, Direction::Out, false, "IRQ6", "PRU1 intr/dma latch -> BIRQ6"),
    wire!(6, 3, Direction::Out, false, "IRQ7", "PRU1 intr/dma latch -> BIRQ7"),
    wire!(6, 4, Direction::Out, false, "DMR", "PRU1 intr/dma latch -> BDMR"),
    wire!(6, 5, Direction::Out, false, "IAKO", "PRU1 intr/dma latch -> BIAKO, grant-chain out"),
    wire!(6, 6, Direction::Out, false, "DMGO", "PRU1 intr/dma latch -> BDMGO, grant-chain out"),
    wire!(6, 7, Direction::Out, false, "SACK", "PRU1 intr/dma latch -> BSACK"),
    wire!(6, 0, Direction::In, false, "IRQ4", "BIRQ4 -> PRU1 intr/dma latch readback"),
    wire!(6, 1, Direction::In, false, "IRQ5", "BIRQ5 -> PRU1 intr/dma latch readback"),
    wire!(6, 2, Direction::In, false, "IRQ6", "BIRQ6 -> PRU1 intr/dma latch readback"),
    wire!(6, 3, Direction::In, false, "IRQ7", "BIRQ7 -> PRU1 intr/dma latch readback"),
    wire!(6, 4, Direction::In, false, "DMR", "BDMR -> PRU1 intr/dma latch readback"),
    wire!(6, 5, Direction::In, false, "IAKI", "BIAKI -> PRU1 intr/dma latch, grant-chain in"),
    wire!(6, 6, Direction::In, false, "DMGI", "BDMGI -> PRU1 intr/dma latch, grant-chain in"),
    wire!(6, 7, Direction::In, false, "SACK", "BSACK -> PRU1 intr/dma latch readback"),
];

impl WireTable for Qbus {
    const REGISTERS: [RegisterInfo; LATCH_REGISTER_COUNT] = [
        RegisterInfo { valid_mask: 0xff, testable_mask: 0xff, inverted_mask: 0 }, // DAL<7:0>
        RegisterInfo { valid_mask: 0xff, testable_mask: 0xff, inverted_mask: 0 }, // DAL<15:8>
        RegisterInfo { valid_mask: 0xff, testable_mask: 0x3f, inverted_mask: 0 }, // DAL<21:16>,BS7*,SYNC
        RegisterInfo { valid_mask: 0x8f, testable_mask: 0, inverted_mask: 0 },    // command/version, not testable
        RegisterInfo { valid_mask: 0x7f, testable_mask: 0x7f, inverted_mask: 0 }, // data control signals
        RegisterInfo { valid_mask: 0x3f, testable_mask: 0x1f, inverted_mask: 0 }, // system signals, SRUN excluded
        RegisterInfo { valid_mask: 0xff, testable_mask: 0xff, inverted_mask: 0 }, // INTR/DMA
        RegisterInfo::EMPTY,
    ];

    fn wires() -> &'static [WireInfo] {
        WIRES
    }
}

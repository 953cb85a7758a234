//! Bytecode decoding and text rendering.
//!
//! A method body is a sequence of 16-bit code units. Each instruction starts
//! with a unit whose low byte is the opcode; its format fixes how many units
//! follow and how operands are packed into them. Switch tables and array
//! data live inline as payload pseudo-instructions behind a `nop` opcode.

use super::opcodes::{lookup, reference_kind, Format, RefKind};
use crate::error::{Error, Result};
use crate::text::{hex_literal, quote};
use std::fmt;

/// Resolves index operands to readable names. Every method returns `None`
/// for an index that is out of range.
pub trait ConstantPool {
    /// String literal
    fn string(&self, index: u32) -> Option<String>;
    /// Type descriptor, e.g. `Ljava/lang/String;`
    fn type_descriptor(&self, index: u32) -> Option<String>;
    /// Field reference as `Lcls;->name:Type`
    fn field(&self, index: u32) -> Option<String>;
    /// Method reference as `Lcls;->name(Params)Ret`
    fn method(&self, index: u32) -> Option<String>;
    /// Prototype as `(Params)Ret`
    fn proto(&self, index: u32) -> Option<String>;
}

const PACKED_SWITCH_PAYLOAD: u16 = 0x0100;
const SPARSE_SWITCH_PAYLOAD: u16 = 0x0200;
const FILL_ARRAY_DATA_PAYLOAD: u16 = 0x0300;

/// One decoded instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    /// Position in code units from the start of the method body
    pub offset: usize,
    /// Opcode byte (0 for payloads)
    pub opcode: u8,
    /// Mnemonic, e.g. `invoke-virtual` or `unused-3e`
    pub mnemonic: String,
    /// Rendered operands, empty if there are none
    pub operands: String,
}

impl Instruction {
    /// The listing line: two spaces, mnemonic and operands
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            write!(f, "  {}", self.mnemonic)
        } else {
            write!(f, "  {} {}", self.mnemonic, self.operands)
        }
    }
}

/// Decodes a whole method body.
///
/// `code_offset` is the byte offset of the code item, used only to report
/// where a truncated instruction starts.
pub fn decode_instructions(
    units: &[u16],
    pool: &dyn ConstantPool,
    code_offset: usize,
) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    let mut position = 0;

    while position < units.len() {
        let (instruction, size) = decode_one(&units[position..], position, pool).ok_or_else(|| {
            Error::malformed_dex(
                code_offset + 16 + position * 2,
                format!("instruction at code unit {} runs past the end of the method", position),
            )
        })?;
        instructions.push(instruction);
        position += size;
    }

    Ok(instructions)
}

/// Decodes the instruction at the start of `units`, returning it and its size
/// in code units, or `None` if it is truncated
fn decode_one(units: &[u16], offset: usize, pool: &dyn ConstantPool) -> Option<(Instruction, usize)> {
    let first = units[0];
    let op = (first & 0xFF) as u8;

    if op == 0x00 && first != 0 {
        if let Some(payload) = decode_payload(units, offset) {
            return payload;
        }
    }

    let Some(opcode) = lookup(op) else {
        let instruction = Instruction {
            offset,
            opcode: op,
            mnemonic: format!("unused-{:02x}", op),
            operands: String::new(),
        };
        return Some((instruction, 1));
    };

    let size = opcode.format.units();
    let units = units.get(..size)?;
    let operands = render_operands(opcode.format, op, units, pool);

    let instruction = Instruction {
        offset,
        opcode: op,
        mnemonic: opcode.name.to_string(),
        operands,
    };
    Some((instruction, size))
}

/// Payloads carry their size in their header. Returns `None` for an ordinary
/// `nop` with a non-zero high byte and `Some(None)` for a truncated payload.
fn decode_payload(units: &[u16], offset: usize) -> Option<Option<(Instruction, usize)>> {
    let ident = units[0];
    let decoded = match ident {
        PACKED_SWITCH_PAYLOAD => packed_switch(units),
        SPARSE_SWITCH_PAYLOAD => sparse_switch(units),
        FILL_ARRAY_DATA_PAYLOAD => fill_array_data(units),
        _ => return None,
    };
    Some(decoded.map(|(mnemonic, operands, size)| {
        let instruction = Instruction {
            offset,
            opcode: 0,
            mnemonic: mnemonic.to_string(),
            operands,
        };
        (instruction, size)
    }))
}

fn packed_switch(units: &[u16]) -> Option<(&'static str, String, usize)> {
    let count = *units.get(1)? as usize;
    let size = 4 + count * 2;
    let units = units.get(..size)?;
    let first_key = word(units[2], units[3]) as i32;
    let targets: Vec<String> = units[4..]
        .chunks_exact(2)
        .map(|pair| branch(word(pair[0], pair[1]) as i32 as i64))
        .collect();
    let operands = format!("#{}, {{{}}}", first_key, targets.join(", "));
    Some(("packed-switch-payload", operands, size))
}

fn sparse_switch(units: &[u16]) -> Option<(&'static str, String, usize)> {
    let count = *units.get(1)? as usize;
    let size = 2 + count * 4;
    let units = units.get(..size)?;
    let (keys, targets) = units[2..].split_at(count * 2);
    let entries: Vec<String> = keys
        .chunks_exact(2)
        .zip(targets.chunks_exact(2))
        .map(|(key, target)| {
            format!(
                "#{}: {}",
                word(key[0], key[1]) as i32,
                branch(word(target[0], target[1]) as i32 as i64)
            )
        })
        .collect();
    Some(("sparse-switch-payload", format!("{{{}}}", entries.join(", ")), size))
}

fn fill_array_data(units: &[u16]) -> Option<(&'static str, String, usize)> {
    let width = *units.get(1)? as usize;
    let count = word(*units.get(2)?, *units.get(3)?) as usize;
    let data_len = width.checked_mul(count)?;
    let size = 4 + (data_len + 1) / 2;
    let units = units.get(..size)?;
    let bytes: Vec<u8> = units[4..]
        .iter()
        .flat_map(|unit| unit.to_le_bytes())
        .take(data_len)
        .collect();
    let operands = format!("width {}, {} elements, {}", width, count, hex_literal(&bytes));
    Some(("fill-array-data-payload", operands, size))
}

fn word(low: u16, high: u16) -> u32 {
    (low as u32) | ((high as u32) << 16)
}

fn reg(n: impl Into<u32>) -> String {
    format!("v{}", n.into())
}

fn literal(value: i64) -> String {
    format!("#{}", value)
}

fn branch(offset: i64) -> String {
    format!("{:+}", offset)
}

fn reference(op: u8, index: u32, pool: &dyn ConstantPool) -> String {
    let Some(kind) = reference_kind(op) else {
        return format!("@{}", index);
    };
    reference_of(kind, index, pool)
}

fn reference_of(kind: RefKind, index: u32, pool: &dyn ConstantPool) -> String {
    let resolved = match kind {
        RefKind::String => pool.string(index).map(|s| quote(&s)),
        RefKind::Type => pool.type_descriptor(index),
        RefKind::Field => pool.field(index),
        RefKind::Method => pool.method(index),
        RefKind::Proto => pool.proto(index),
        RefKind::CallSite | RefKind::MethodHandle => None,
    };
    resolved.unwrap_or_else(|| format!("{}@{}", kind.prefix(), index))
}

fn register_list(count: u16, unit0: u16, unit2: u16) -> String {
    let regs = [
        unit2 & 0xF,
        (unit2 >> 4) & 0xF,
        (unit2 >> 8) & 0xF,
        unit2 >> 12,
        (unit0 >> 8) & 0xF,
    ];
    let listed: Vec<String> = regs
        .iter()
        .take((count as usize).min(regs.len()))
        .map(|&r| reg(r))
        .collect();
    format!("{{{}}}", listed.join(", "))
}

fn register_range(count: u16, first: u16) -> String {
    match count {
        0 => "{}".to_string(),
        1 => format!("{{{}}}", reg(first)),
        _ => format!("{{{} .. {}}}", reg(first), reg(first as u32 + count as u32 - 1)),
    }
}

fn render_operands(format: Format, op: u8, u: &[u16], pool: &dyn ConstantPool) -> String {
    let aa = u[0] >> 8;
    let a = (u[0] >> 8) & 0xF;
    let b = u[0] >> 12;

    match format {
        Format::F10x => String::new(),
        Format::F12x => format!("{}, {}", reg(a), reg(b)),
        Format::F11n => {
            // Sign-extend the high nibble
            let value = ((u[0] as i16) >> 12) as i64;
            format!("{}, {}", reg(a), literal(value))
        }
        Format::F11x => reg(aa),
        Format::F10t => branch((aa as u8 as i8) as i64),
        Format::F20t => branch(u[1] as i16 as i64),
        Format::F22x => format!("{}, {}", reg(aa), reg(u[1])),
        Format::F21t => format!("{}, {}", reg(aa), branch(u[1] as i16 as i64)),
        Format::F21s => format!("{}, {}", reg(aa), literal(u[1] as i16 as i64)),
        Format::F21h => {
            let value = if op == 0x19 {
                (u[1] as i16 as i64) << 48
            } else {
                ((u[1] as i16 as i32) << 16) as i64
            };
            format!("{}, {}", reg(aa), literal(value))
        }
        Format::F21c => format!("{}, {}", reg(aa), reference(op, u[1] as u32, pool)),
        Format::F23x => format!("{}, {}, {}", reg(aa), reg(u[1] & 0xFF), reg(u[1] >> 8)),
        Format::F22b => format!(
            "{}, {}, {}",
            reg(aa),
            reg(u[1] & 0xFF),
            literal(((u[1] >> 8) as u8 as i8) as i64)
        ),
        Format::F22t => format!("{}, {}, {}", reg(a), reg(b), branch(u[1] as i16 as i64)),
        Format::F22s => format!("{}, {}, {}", reg(a), reg(b), literal(u[1] as i16 as i64)),
        Format::F22c => format!("{}, {}, {}", reg(a), reg(b), reference(op, u[1] as u32, pool)),
        Format::F30t => branch(word(u[1], u[2]) as i32 as i64),
        Format::F32x => format!("{}, {}", reg(u[1]), reg(u[2])),
        Format::F31i => format!("{}, {}", reg(aa), literal(word(u[1], u[2]) as i32 as i64)),
        Format::F31t => format!("{}, {}", reg(aa), branch(word(u[1], u[2]) as i32 as i64)),
        Format::F31c => format!("{}, {}", reg(aa), reference(op, word(u[1], u[2]), pool)),
        Format::F35c => format!(
            "{}, {}",
            register_list(b, u[0], u[2]),
            reference(op, u[1] as u32, pool)
        ),
        Format::F3rc => format!(
            "{}, {}",
            register_range(aa, u[2]),
            reference(op, u[1] as u32, pool)
        ),
        Format::F45cc => format!(
            "{}, {}, {}",
            register_list(b, u[0], u[2]),
            reference(op, u[1] as u32, pool),
            reference_of(RefKind::Proto, u[3] as u32, pool)
        ),
        Format::F4rcc => format!(
            "{}, {}, {}",
            register_range(aa, u[2]),
            reference(op, u[1] as u32, pool),
            reference_of(RefKind::Proto, u[3] as u32, pool)
        ),
        Format::F51l => {
            let value = (u[1] as u64)
                | ((u[2] as u64) << 16)
                | ((u[3] as u64) << 32)
                | ((u[4] as u64) << 48);
            format!("{}, {}", reg(aa), literal(value as i64))
        }
    }
}

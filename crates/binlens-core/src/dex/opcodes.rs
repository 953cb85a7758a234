//! Dalvik opcode table.

/// Instruction encoding formats. The first digit of the format name is the
/// size in 16-bit code units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Format {
    F10x,
    F12x,
    F11n,
    F11x,
    F10t,
    F20t,
    F22x,
    F21t,
    F21s,
    F21h,
    F21c,
    F23x,
    F22b,
    F22t,
    F22s,
    F22c,
    F30t,
    F32x,
    F31i,
    F31t,
    F31c,
    F35c,
    F3rc,
    F45cc,
    F4rcc,
    F51l,
}

impl Format {
    /// Instruction size in code units
    pub fn units(self) -> usize {
        use Format::*;
        match self {
            F10x | F12x | F11n | F11x | F10t => 1,
            F20t | F22x | F21t | F21s | F21h | F21c | F23x | F22b | F22t | F22s | F22c => 2,
            F30t | F32x | F31i | F31t | F31c | F35c | F3rc => 3,
            F45cc | F4rcc => 4,
            F51l => 5,
        }
    }
}

/// What an index operand refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    /// `string_ids` entry
    String,
    /// `type_ids` entry
    Type,
    /// `field_ids` entry
    Field,
    /// `method_ids` entry
    Method,
    /// `proto_ids` entry
    Proto,
    /// `call_site_ids` entry
    CallSite,
    /// `method_handles` entry
    MethodHandle,
}

impl RefKind {
    /// Prefix used when the index cannot be resolved, as in `string@12`
    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::String => "string",
            RefKind::Type => "type",
            RefKind::Field => "field",
            RefKind::Method => "method",
            RefKind::Proto => "proto",
            RefKind::CallSite => "call_site",
            RefKind::MethodHandle => "method_handle",
        }
    }
}

/// Static description of an assigned opcode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    /// Mnemonic, e.g. `invoke-virtual`
    pub name: &'static str,
    /// Encoding format
    pub format: Format,
}

const UNARY_OPS: [&str; 21] = [
    "neg-int",
    "not-int",
    "neg-long",
    "not-long",
    "neg-float",
    "neg-double",
    "int-to-long",
    "int-to-float",
    "int-to-double",
    "long-to-int",
    "long-to-float",
    "long-to-double",
    "float-to-int",
    "float-to-long",
    "float-to-double",
    "double-to-int",
    "double-to-long",
    "double-to-float",
    "int-to-byte",
    "int-to-char",
    "int-to-short",
];

const BINARY_OPS: [&str; 32] = [
    "add-int", "sub-int", "mul-int", "div-int", "rem-int", "and-int", "or-int", "xor-int",
    "shl-int", "shr-int", "ushr-int", "add-long", "sub-long", "mul-long", "div-long", "rem-long",
    "and-long", "or-long", "xor-long", "shl-long", "shr-long", "ushr-long", "add-float",
    "sub-float", "mul-float", "div-float", "rem-float", "add-double", "sub-double",
    "mul-double", "div-double", "rem-double",
];

const BINARY_OPS_2ADDR: [&str; 32] = [
    "add-int/2addr", "sub-int/2addr", "mul-int/2addr", "div-int/2addr", "rem-int/2addr",
    "and-int/2addr", "or-int/2addr", "xor-int/2addr", "shl-int/2addr", "shr-int/2addr",
    "ushr-int/2addr", "add-long/2addr", "sub-long/2addr", "mul-long/2addr", "div-long/2addr",
    "rem-long/2addr", "and-long/2addr", "or-long/2addr", "xor-long/2addr", "shl-long/2addr",
    "shr-long/2addr", "ushr-long/2addr", "add-float/2addr", "sub-float/2addr",
    "mul-float/2addr", "div-float/2addr", "rem-float/2addr", "add-double/2addr",
    "sub-double/2addr", "mul-double/2addr", "div-double/2addr", "rem-double/2addr",
];

const LIT16_OPS: [&str; 8] = [
    "add-int/lit16",
    "rsub-int",
    "mul-int/lit16",
    "div-int/lit16",
    "rem-int/lit16",
    "and-int/lit16",
    "or-int/lit16",
    "xor-int/lit16",
];

const LIT8_OPS: [&str; 11] = [
    "add-int/lit8",
    "rsub-int/lit8",
    "mul-int/lit8",
    "div-int/lit8",
    "rem-int/lit8",
    "and-int/lit8",
    "or-int/lit8",
    "xor-int/lit8",
    "shl-int/lit8",
    "shr-int/lit8",
    "ushr-int/lit8",
];

const ARRAY_OPS: [&str; 14] = [
    "aget",
    "aget-wide",
    "aget-object",
    "aget-boolean",
    "aget-byte",
    "aget-char",
    "aget-short",
    "aput",
    "aput-wide",
    "aput-object",
    "aput-boolean",
    "aput-byte",
    "aput-char",
    "aput-short",
];

const INSTANCE_FIELD_OPS: [&str; 14] = [
    "iget",
    "iget-wide",
    "iget-object",
    "iget-boolean",
    "iget-byte",
    "iget-char",
    "iget-short",
    "iput",
    "iput-wide",
    "iput-object",
    "iput-boolean",
    "iput-byte",
    "iput-char",
    "iput-short",
];

const STATIC_FIELD_OPS: [&str; 14] = [
    "sget",
    "sget-wide",
    "sget-object",
    "sget-boolean",
    "sget-byte",
    "sget-char",
    "sget-short",
    "sput",
    "sput-wide",
    "sput-object",
    "sput-boolean",
    "sput-byte",
    "sput-char",
    "sput-short",
];

const COMPARE_OPS: [&str; 5] = ["cmpl-float", "cmpg-float", "cmpl-double", "cmpg-double", "cmp-long"];
const IF_TEST_OPS: [&str; 6] = ["if-eq", "if-ne", "if-lt", "if-ge", "if-gt", "if-le"];
const IF_TESTZ_OPS: [&str; 6] = ["if-eqz", "if-nez", "if-ltz", "if-gez", "if-gtz", "if-lez"];
const INVOKE_OPS: [&str; 5] = [
    "invoke-virtual",
    "invoke-super",
    "invoke-direct",
    "invoke-static",
    "invoke-interface",
];
const INVOKE_RANGE_OPS: [&str; 5] = [
    "invoke-virtual/range",
    "invoke-super/range",
    "invoke-direct/range",
    "invoke-static/range",
    "invoke-interface/range",
];

/// Looks up an opcode; `None` for unassigned values
pub fn lookup(op: u8) -> Option<Opcode> {
    use Format::*;

    let (name, format) = match op {
        0x00 => ("nop", F10x),
        0x01 => ("move", F12x),
        0x02 => ("move/from16", F22x),
        0x03 => ("move/16", F32x),
        0x04 => ("move-wide", F12x),
        0x05 => ("move-wide/from16", F22x),
        0x06 => ("move-wide/16", F32x),
        0x07 => ("move-object", F12x),
        0x08 => ("move-object/from16", F22x),
        0x09 => ("move-object/16", F32x),
        0x0a => ("move-result", F11x),
        0x0b => ("move-result-wide", F11x),
        0x0c => ("move-result-object", F11x),
        0x0d => ("move-exception", F11x),
        0x0e => ("return-void", F10x),
        0x0f => ("return", F11x),
        0x10 => ("return-wide", F11x),
        0x11 => ("return-object", F11x),
        0x12 => ("const/4", F11n),
        0x13 => ("const/16", F21s),
        0x14 => ("const", F31i),
        0x15 => ("const/high16", F21h),
        0x16 => ("const-wide/16", F21s),
        0x17 => ("const-wide/32", F31i),
        0x18 => ("const-wide", F51l),
        0x19 => ("const-wide/high16", F21h),
        0x1a => ("const-string", F21c),
        0x1b => ("const-string/jumbo", F31c),
        0x1c => ("const-class", F21c),
        0x1d => ("monitor-enter", F11x),
        0x1e => ("monitor-exit", F11x),
        0x1f => ("check-cast", F21c),
        0x20 => ("instance-of", F22c),
        0x21 => ("array-length", F12x),
        0x22 => ("new-instance", F21c),
        0x23 => ("new-array", F22c),
        0x24 => ("filled-new-array", F35c),
        0x25 => ("filled-new-array/range", F3rc),
        0x26 => ("fill-array-data", F31t),
        0x27 => ("throw", F11x),
        0x28 => ("goto", F10t),
        0x29 => ("goto/16", F20t),
        0x2a => ("goto/32", F30t),
        0x2b => ("packed-switch", F31t),
        0x2c => ("sparse-switch", F31t),
        0x2d..=0x31 => (COMPARE_OPS[(op - 0x2d) as usize], F23x),
        0x32..=0x37 => (IF_TEST_OPS[(op - 0x32) as usize], F22t),
        0x38..=0x3d => (IF_TESTZ_OPS[(op - 0x38) as usize], F21t),
        0x44..=0x51 => (ARRAY_OPS[(op - 0x44) as usize], F23x),
        0x52..=0x5f => (INSTANCE_FIELD_OPS[(op - 0x52) as usize], F22c),
        0x60..=0x6d => (STATIC_FIELD_OPS[(op - 0x60) as usize], F21c),
        0x6e..=0x72 => (INVOKE_OPS[(op - 0x6e) as usize], F35c),
        0x74..=0x78 => (INVOKE_RANGE_OPS[(op - 0x74) as usize], F3rc),
        0x7b..=0x8f => (UNARY_OPS[(op - 0x7b) as usize], F12x),
        0x90..=0xaf => (BINARY_OPS[(op - 0x90) as usize], F23x),
        0xb0..=0xcf => (BINARY_OPS_2ADDR[(op - 0xb0) as usize], F12x),
        0xd0..=0xd7 => (LIT16_OPS[(op - 0xd0) as usize], F22s),
        0xd8..=0xe2 => (LIT8_OPS[(op - 0xd8) as usize], F22b),
        0xfa => ("invoke-polymorphic", F45cc),
        0xfb => ("invoke-polymorphic/range", F4rcc),
        0xfc => ("invoke-custom", F35c),
        0xfd => ("invoke-custom/range", F3rc),
        0xfe => ("const-method-handle", F21c),
        0xff => ("const-method-type", F21c),
        _ => return None,
    };
    Some(Opcode { name, format })
}

/// The pool an opcode's index operand refers to, if it has one
pub fn reference_kind(op: u8) -> Option<RefKind> {
    match op {
        0x1a | 0x1b => Some(RefKind::String),
        0x1c | 0x1f | 0x20 | 0x22..=0x25 => Some(RefKind::Type),
        0x52..=0x6d => Some(RefKind::Field),
        0x6e..=0x72 | 0x74..=0x78 | 0xfa | 0xfb => Some(RefKind::Method),
        0xfc | 0xfd => Some(RefKind::CallSite),
        0xfe => Some(RefKind::MethodHandle),
        0xff => Some(RefKind::Proto),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let op = lookup(0x6e).unwrap();
        assert_eq!(op.name, "invoke-virtual");
        assert_eq!(op.format, Format::F35c);
        assert_eq!(op.format.units(), 3);

        assert_eq!(lookup(0x18).unwrap().format.units(), 5);
        assert_eq!(lookup(0xb0).unwrap().name, "add-int/2addr");
        assert_eq!(lookup(0xcf).unwrap().name, "rem-double/2addr");
        assert_eq!(lookup(0xe2).unwrap().name, "ushr-int/lit8");
        assert_eq!(lookup(0x8f).unwrap().name, "int-to-short");
    }

    #[test]
    fn test_unassigned() {
        for op in [0x3e, 0x43, 0x73, 0x79, 0x7a, 0xe3, 0xf9] {
            assert!(lookup(op).is_none(), "opcode {:#04x}", op);
        }
    }

    #[test]
    fn test_table_is_consistent() {
        let assigned = (0..=255u8).filter_map(lookup).count();
        assert_eq!(assigned, 256 - 6 - 1 - 2 - 23);

        for op in 0x6e..=0x72 {
            assert!(lookup(op).unwrap().name.starts_with("invoke-"));
            assert_eq!(reference_kind(op), Some(RefKind::Method));
        }
    }

    #[test]
    fn test_reference_kinds() {
        assert_eq!(reference_kind(0x1a), Some(RefKind::String));
        assert_eq!(reference_kind(0x23), Some(RefKind::Type));
        assert_eq!(reference_kind(0x60), Some(RefKind::Field));
        assert_eq!(reference_kind(0xff), Some(RefKind::Proto));
        assert_eq!(reference_kind(0x01), None);
        assert_eq!(RefKind::CallSite.prefix(), "call_site");
    }
}

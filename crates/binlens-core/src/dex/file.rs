//! Dalvik executable container parsing.

use super::insn::ConstantPool;
use super::reader::Reader;
use super::signature::internal_type_name;
use crate::error::{Error, Result};
use tracing::trace;

const HEADER_SIZE: usize = 0x70;
const ENDIAN_CONSTANT: u32 = 0x1234_5678;
const REVERSE_ENDIAN_CONSTANT: u32 = 0x7856_3412;
const NO_INDEX: u32 = 0xFFFF_FFFF;

const STRING_ID_SIZE: usize = 4;
const TYPE_ID_SIZE: usize = 4;
const PROTO_ID_SIZE: usize = 12;
const FIELD_ID_SIZE: usize = 8;
const METHOD_ID_SIZE: usize = 8;
const CLASS_DEF_SIZE: usize = 32;

/// Location of an id table inside the container
#[derive(Debug, Clone, Copy, Default)]
struct Table {
    size: u32,
    offset: u32,
    entry_size: usize,
}

impl Table {
    /// Byte offset of entry `index`, or `None` if out of range
    fn entry(&self, index: u32) -> Option<usize> {
        (index < self.size).then(|| self.offset as usize + index as usize * self.entry_size)
    }
}

/// One `class_def_item`
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClassDef {
    pub(crate) class_idx: u32,
    pub(crate) access_flags: u32,
    pub(crate) superclass_idx: u32,
    pub(crate) class_data_off: u32,
}

/// One method entry from `class_data_item`
#[derive(Debug, Clone, Copy)]
pub(crate) struct EncodedMethod {
    pub(crate) method_idx: u32,
    pub(crate) access_flags: u32,
    pub(crate) code_off: u32,
}

/// Resolved `method_id_item`
#[derive(Debug, Clone)]
pub(crate) struct MethodId {
    pub(crate) class_idx: u16,
    pub(crate) proto_idx: u16,
    pub(crate) name: String,
}

/// Resolved `proto_id_item`
#[derive(Debug, Clone)]
pub(crate) struct Proto {
    pub(crate) shorty: String,
    pub(crate) return_type: String,
    pub(crate) parameters: Vec<String>,
}

/// A validated, borrowed view of a container
#[derive(Debug, Clone)]
pub(crate) struct DexFile<'a> {
    data: &'a [u8],
    string_ids: Table,
    type_ids: Table,
    proto_ids: Table,
    field_ids: Table,
    method_ids: Table,
    class_defs: Table,
}

impl<'a> DexFile<'a> {
    /// Validates the header and id table bounds
    pub(crate) fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::malformed_dex(
                0,
                format!("file is {} bytes, shorter than the header", data.len()),
            ));
        }

        let magic = &data[..8];
        let version_ok = magic[4..7].iter().all(u8::is_ascii_digit);
        if &magic[..4] != b"dex\n" || !version_ok || magic[7] != 0 {
            return Err(Error::malformed_dex(0, "bad magic"));
        }

        let mut header = Reader::new(data, 0x28);
        match header.u32()? {
            ENDIAN_CONSTANT => {}
            REVERSE_ENDIAN_CONSTANT => {
                return Err(Error::malformed_dex(0x28, "big-endian containers are not supported"))
            }
            other => {
                return Err(Error::malformed_dex(0x28, format!("bad endian tag {:#010x}", other)))
            }
        }

        let mut header = Reader::new(data, 0x38);
        let mut table = |entry_size: usize| -> Result<Table> {
            let position = header.position();
            let size = header.u32()?;
            let offset = header.u32()?;
            let end = (size as usize)
                .checked_mul(entry_size)
                .and_then(|len| len.checked_add(offset as usize));
            match end {
                Some(end) if end <= data.len() => Ok(Table {
                    size,
                    offset,
                    entry_size,
                }),
                _ => Err(Error::malformed_dex(position, "id table extends past end of file")),
            }
        };

        let file = Self {
            data,
            string_ids: table(STRING_ID_SIZE)?,
            type_ids: table(TYPE_ID_SIZE)?,
            proto_ids: table(PROTO_ID_SIZE)?,
            field_ids: table(FIELD_ID_SIZE)?,
            method_ids: table(METHOD_ID_SIZE)?,
            class_defs: table(CLASS_DEF_SIZE)?,
        };
        trace!(
            "Parsed dex header: {} strings, {} types, {} methods, {} classes",
            file.string_ids.size,
            file.type_ids.size,
            file.method_ids.size,
            file.class_defs.size
        );
        Ok(file)
    }

    fn reader_at(&self, offset: usize) -> Reader<'a> {
        Reader::new(self.data, offset)
    }

    fn entry(&self, table: &Table, index: u32, what: &str) -> Result<usize> {
        table.entry(index).ok_or_else(|| {
            Error::malformed_dex(
                table.offset as usize,
                format!("{} index {} out of range ({} entries)", what, index, table.size),
            )
        })
    }

    pub(crate) fn string_at(&self, index: u32) -> Result<String> {
        let entry = self.entry(&self.string_ids, index, "string")?;
        let data_off = self.reader_at(entry).u32()? as usize;
        let mut reader = self.reader_at(data_off);
        // utf16 length, not needed for decoding
        reader.uleb128()?;
        reader.mutf8()
    }

    pub(crate) fn type_at(&self, index: u32) -> Result<String> {
        let entry = self.entry(&self.type_ids, index, "type")?;
        let string_idx = self.reader_at(entry).u32()?;
        self.string_at(string_idx)
    }

    pub(crate) fn proto_at(&self, index: u32) -> Result<Proto> {
        let entry = self.entry(&self.proto_ids, index, "proto")?;
        let mut reader = self.reader_at(entry);
        let shorty_idx = reader.u32()?;
        let return_idx = reader.u32()?;
        let params_off = reader.u32()?;

        let mut parameters = Vec::new();
        if params_off != 0 {
            let mut list = self.reader_at(params_off as usize);
            let count = list.u32()?;
            for _ in 0..count {
                parameters.push(self.type_at(list.u16()? as u32)?);
            }
        }

        Ok(Proto {
            shorty: self.string_at(shorty_idx)?,
            return_type: self.type_at(return_idx)?,
            parameters,
        })
    }

    pub(crate) fn method_at(&self, index: u32) -> Result<MethodId> {
        let entry = self.entry(&self.method_ids, index, "method")?;
        let mut reader = self.reader_at(entry);
        let class_idx = reader.u16()?;
        let proto_idx = reader.u16()?;
        let name_idx = reader.u32()?;
        Ok(MethodId {
            class_idx,
            proto_idx,
            name: self.string_at(name_idx)?,
        })
    }

    fn field_text(&self, index: u32) -> Result<String> {
        let entry = self.entry(&self.field_ids, index, "field")?;
        let mut reader = self.reader_at(entry);
        let class_idx = reader.u16()?;
        let type_idx = reader.u16()?;
        let name_idx = reader.u32()?;
        Ok(format!(
            "{}->{}:{}",
            self.type_at(class_idx as u32)?,
            self.string_at(name_idx)?,
            self.type_at(type_idx as u32)?
        ))
    }

    fn method_text(&self, index: u32) -> Result<String> {
        let method = self.method_at(index)?;
        Ok(format!(
            "{}->{}{}",
            self.type_at(method.class_idx as u32)?,
            method.name,
            self.proto_text(method.proto_idx as u32)?
        ))
    }

    fn proto_text(&self, index: u32) -> Result<String> {
        let proto = self.proto_at(index)?;
        Ok(format!("({}){}", proto.parameters.concat(), proto.return_type))
    }

    pub(crate) fn class_count(&self) -> u32 {
        self.class_defs.size
    }

    pub(crate) fn class_def(&self, index: u32) -> Result<ClassDef> {
        let entry = self.entry(&self.class_defs, index, "class_def")?;
        let mut reader = self.reader_at(entry);
        let class_idx = reader.u32()?;
        let access_flags = reader.u32()?;
        let superclass_idx = reader.u32()?;
        let mut reader = self.reader_at(entry + 24);
        let class_data_off = reader.u32()?;
        Ok(ClassDef {
            class_idx,
            access_flags,
            superclass_idx,
            class_data_off,
        })
    }

    /// Internal name of a class definition, e.g. `com/example/Foo`
    pub(crate) fn class_name(&self, def: &ClassDef) -> Result<String> {
        Ok(internal_type_name(&self.type_at(def.class_idx)?))
    }

    pub(crate) fn superclass_name(&self, def: &ClassDef) -> Result<Option<String>> {
        if def.superclass_idx == NO_INDEX {
            return Ok(None);
        }
        Ok(Some(internal_type_name(&self.type_at(def.superclass_idx)?)))
    }

    /// Direct and virtual methods of a class, in declaration order
    pub(crate) fn class_methods(&self, def: &ClassDef) -> Result<(Vec<EncodedMethod>, Vec<EncodedMethod>)> {
        if def.class_data_off == 0 {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut reader = self.reader_at(def.class_data_off as usize);
        let static_fields = reader.uleb128()?;
        let instance_fields = reader.uleb128()?;
        let direct_count = reader.uleb128()?;
        let virtual_count = reader.uleb128()?;

        for _ in 0..(static_fields as u64 + instance_fields as u64) {
            reader.uleb128()?; // field_idx_diff
            reader.uleb128()?; // access_flags
        }

        let direct = self.encoded_methods(&mut reader, direct_count)?;
        let virtual_methods = self.encoded_methods(&mut reader, virtual_count)?;
        Ok((direct, virtual_methods))
    }

    fn encoded_methods(&self, reader: &mut Reader<'a>, count: u32) -> Result<Vec<EncodedMethod>> {
        let mut methods = Vec::new();
        let mut method_idx: u32 = 0;
        for _ in 0..count {
            let position = reader.position();
            // Indices are delta-encoded; the first entry's delta is from zero
            method_idx = method_idx
                .checked_add(reader.uleb128()?)
                .ok_or_else(|| Error::malformed_dex(position, "method index overflows"))?;
            methods.push(EncodedMethod {
                method_idx,
                access_flags: reader.uleb128()?,
                code_off: reader.uleb128()?,
            });
        }
        Ok(methods)
    }

    /// Reads the instruction units of the `code_item` at `offset`
    pub(crate) fn code_units(&self, offset: u32) -> Result<Vec<u16>> {
        let mut reader = self.reader_at(offset as usize + 12);
        let insns_size = reader.u32()?;
        reader.code_units(insns_size as usize)
    }
}

impl ConstantPool for DexFile<'_> {
    fn string(&self, index: u32) -> Option<String> {
        self.string_at(index).ok()
    }

    fn type_descriptor(&self, index: u32) -> Option<String> {
        self.type_at(index).ok()
    }

    fn field(&self, index: u32) -> Option<String> {
        self.field_text(index).ok()
    }

    fn method(&self, index: u32) -> Option<String> {
        self.method_text(index).ok()
    }

    fn proto(&self, index: u32) -> Option<String> {
        self.proto_text(index).ok()
    }
}

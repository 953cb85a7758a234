//! Assembles small containers for tests.

use std::collections::HashMap;

const HEADER_SIZE: usize = 0x70;

pub(crate) struct MethodSpec {
    pub(crate) method_idx: u32,
    pub(crate) access_flags: u32,
    pub(crate) code: Option<Vec<u16>>,
}

struct ClassSpec {
    type_idx: u32,
    superclass_idx: u32,
    /// `None` writes no class_data_item at all
    methods: Option<(Vec<MethodSpec>, Vec<MethodSpec>)>,
}

#[derive(Default)]
pub(crate) struct DexBuilder {
    strings: Vec<String>,
    string_index: HashMap<String, u32>,
    types: Vec<u32>,
    protos: Vec<(u32, u32, Vec<u16>)>,
    fields: Vec<(u16, u16, u32)>,
    methods: Vec<(u16, u16, u32)>,
    classes: Vec<ClassSpec>,
}

impl DexBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn string(&mut self, s: &str) -> u32 {
        if let Some(&index) = self.string_index.get(s) {
            return index;
        }
        let index = self.strings.len() as u32;
        self.strings.push(s.to_string());
        self.string_index.insert(s.to_string(), index);
        index
    }

    pub(crate) fn type_id(&mut self, descriptor: &str) -> u32 {
        let string_idx = self.string(descriptor);
        if let Some(index) = self.types.iter().position(|&s| s == string_idx) {
            return index as u32;
        }
        self.types.push(string_idx);
        (self.types.len() - 1) as u32
    }

    pub(crate) fn proto(&mut self, shorty: &str, return_type: &str, params: &[&str]) -> u32 {
        let shorty_idx = self.string(shorty);
        let return_idx = self.type_id(return_type);
        let params: Vec<u16> = params.iter().map(|p| self.type_id(p) as u16).collect();
        self.protos.push((shorty_idx, return_idx, params));
        (self.protos.len() - 1) as u32
    }

    pub(crate) fn field(&mut self, class: &str, name: &str, ty: &str) -> u32 {
        let class_idx = self.type_id(class) as u16;
        let type_idx = self.type_id(ty) as u16;
        let name_idx = self.string(name);
        self.fields.push((class_idx, type_idx, name_idx));
        (self.fields.len() - 1) as u32
    }

    pub(crate) fn method(
        &mut self,
        class: &str,
        name: &str,
        shorty: &str,
        return_type: &str,
        params: &[&str],
    ) -> u32 {
        let class_idx = self.type_id(class) as u16;
        let proto_idx = self.proto(shorty, return_type, params) as u16;
        let name_idx = self.string(name);
        self.methods.push((class_idx, proto_idx, name_idx));
        (self.methods.len() - 1) as u32
    }

    /// Adds a class; method lists must be in ascending method index order
    pub(crate) fn class(
        &mut self,
        descriptor: &str,
        superclass: Option<&str>,
        direct: Vec<MethodSpec>,
        virtual_methods: Vec<MethodSpec>,
    ) {
        let type_idx = self.type_id(descriptor);
        let superclass_idx = superclass.map_or(u32::MAX, |s| self.type_id(s));
        self.classes.push(ClassSpec {
            type_idx,
            superclass_idx,
            methods: Some((direct, virtual_methods)),
        });
    }

    /// Adds a class without class data
    pub(crate) fn bare_class(&mut self, descriptor: &str) {
        let type_idx = self.type_id(descriptor);
        self.classes.push(ClassSpec {
            type_idx,
            superclass_idx: u32::MAX,
            methods: None,
        });
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let string_ids_off = HEADER_SIZE;
        let type_ids_off = string_ids_off + self.strings.len() * 4;
        let proto_ids_off = type_ids_off + self.types.len() * 4;
        let field_ids_off = proto_ids_off + self.protos.len() * 12;
        let method_ids_off = field_ids_off + self.fields.len() * 8;
        let class_defs_off = method_ids_off + self.methods.len() * 8;
        let data_off = class_defs_off + self.classes.len() * 32;

        let mut out = vec![0u8; data_off];

        let mut string_offsets = Vec::new();
        for s in &self.strings {
            string_offsets.push(out.len() as u32);
            uleb128(s.encode_utf16().count() as u32, &mut out);
            out.extend_from_slice(s.as_bytes());
            out.push(0);
        }

        let mut param_offsets = Vec::new();
        for (_, _, params) in &self.protos {
            if params.is_empty() {
                param_offsets.push(0);
                continue;
            }
            align4(&mut out);
            param_offsets.push(out.len() as u32);
            out.extend_from_slice(&(params.len() as u32).to_le_bytes());
            for p in params {
                out.extend_from_slice(&p.to_le_bytes());
            }
        }

        let mut class_data_offsets = Vec::new();
        for class in &self.classes {
            let Some((direct, virtual_methods)) = &class.methods else {
                class_data_offsets.push(0);
                continue;
            };

            let mut code_offsets = Vec::new();
            for method in direct.iter().chain(virtual_methods) {
                let Some(code) = &method.code else {
                    code_offsets.push(0);
                    continue;
                };
                align4(&mut out);
                code_offsets.push(out.len() as u32);
                out.extend_from_slice(&1u16.to_le_bytes()); // registers_size
                out.extend_from_slice(&0u16.to_le_bytes()); // ins_size
                out.extend_from_slice(&0u16.to_le_bytes()); // outs_size
                out.extend_from_slice(&0u16.to_le_bytes()); // tries_size
                out.extend_from_slice(&0u32.to_le_bytes()); // debug_info_off
                out.extend_from_slice(&(code.len() as u32).to_le_bytes());
                for unit in code {
                    out.extend_from_slice(&unit.to_le_bytes());
                }
            }

            class_data_offsets.push(out.len() as u32);
            uleb128(0, &mut out);
            uleb128(0, &mut out);
            uleb128(direct.len() as u32, &mut out);
            uleb128(virtual_methods.len() as u32, &mut out);
            let mut code_offsets = code_offsets.into_iter();
            for list in [direct, virtual_methods] {
                let mut previous = 0;
                for method in list {
                    uleb128(method.method_idx - previous, &mut out);
                    uleb128(method.access_flags, &mut out);
                    uleb128(code_offsets.next().unwrap_or(0), &mut out);
                    previous = method.method_idx;
                }
            }
        }

        // Header
        out[..8].copy_from_slice(b"dex\n035\0");
        let file_size = out.len() as u32;
        put_u32(&mut out, 0x20, file_size);
        put_u32(&mut out, 0x24, HEADER_SIZE as u32);
        put_u32(&mut out, 0x28, 0x1234_5678);
        let tables = [
            (self.strings.len(), string_ids_off),
            (self.types.len(), type_ids_off),
            (self.protos.len(), proto_ids_off),
            (self.fields.len(), field_ids_off),
            (self.methods.len(), method_ids_off),
            (self.classes.len(), class_defs_off),
        ];
        for (i, (size, offset)) in tables.iter().enumerate() {
            put_u32(&mut out, 0x38 + i * 8, *size as u32);
            put_u32(&mut out, 0x3C + i * 8, if *size == 0 { 0 } else { *offset as u32 });
        }

        // Id tables
        for (i, offset) in string_offsets.iter().enumerate() {
            put_u32(&mut out, string_ids_off + i * 4, *offset);
        }
        for (i, string_idx) in self.types.iter().enumerate() {
            put_u32(&mut out, type_ids_off + i * 4, *string_idx);
        }
        for (i, (shorty, ret, _)) in self.protos.iter().enumerate() {
            let base = proto_ids_off + i * 12;
            put_u32(&mut out, base, *shorty);
            put_u32(&mut out, base + 4, *ret);
            put_u32(&mut out, base + 8, param_offsets[i]);
        }
        for (i, (class, ty, name)) in self.fields.iter().enumerate() {
            let base = field_ids_off + i * 8;
            put_u16(&mut out, base, *class);
            put_u16(&mut out, base + 2, *ty);
            put_u32(&mut out, base + 4, *name);
        }
        for (i, (class, proto, name)) in self.methods.iter().enumerate() {
            let base = method_ids_off + i * 8;
            put_u16(&mut out, base, *class);
            put_u16(&mut out, base + 2, *proto);
            put_u32(&mut out, base + 4, *name);
        }
        for (i, class) in self.classes.iter().enumerate() {
            let base = class_defs_off + i * 32;
            put_u32(&mut out, base, class.type_idx);
            put_u32(&mut out, base + 4, 0x0001); // ACC_PUBLIC
            put_u32(&mut out, base + 8, class.superclass_idx);
            put_u32(&mut out, base + 12, 0);
            put_u32(&mut out, base + 16, u32::MAX);
            put_u32(&mut out, base + 24, class_data_offsets[i]);
        }

        out
    }
}

fn uleb128(mut value: u32, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn align4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn put_u16(out: &mut [u8], offset: usize, value: u16) {
    out[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(out: &mut [u8], offset: usize, value: u32) {
    out[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

//! Dalvik executable (DEX) class-file decoding.
//!
//! Every operation takes the raw container bytes and re-parses what it needs;
//! nothing parsed is cached between calls. Classes are addressed by their
//! slash-separated internal name (`com/example/Foo`) and methods by their
//! simple name, both matched exactly. When several entries share a name the
//! first in container order wins, with direct methods searched before virtual
//! ones.
//!
//! ```text
//! list_classes      -> ["com/example/Greeter", ...]
//! list_methods      -> [MethodDescriptor { name: "greet", shorty: "VL", .. }, ...]
//! list_instructions -> ["  const-string v0, \"hi\"", "  return-void"]
//! ```

mod file;
mod insn;
mod opcodes;
mod reader;
mod signature;

#[cfg(test)]
pub(crate) mod builder;

pub use insn::{decode_instructions, ConstantPool, Instruction};
pub use opcodes::{lookup as lookup_opcode, reference_kind, Format, Opcode, RefKind};
pub use reader::decode_mutf8;
pub use signature::{
    format_signature, internal_type_name, shorty_type_name, ARRAY_PLACEHOLDER, OBJECT_PLACEHOLDER,
    UNKNOWN_TYPE,
};

use crate::error::{Error, Result};
use file::{ClassDef, DexFile, EncodedMethod};
use tracing::debug;

/// A method as declared in a class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    /// Simple name, e.g. `<init>` or `toString`
    pub name: String,
    /// Shorty descriptor, return type first
    pub shorty: String,
    /// Display name of the declared return type, e.g. `java/lang/String`
    pub return_type: Option<String>,
    /// Parameter type descriptors in declared order
    pub parameters: Vec<String>,
    /// `ACC_*` flags
    pub access_flags: u32,
    /// Byte offset of the code item; zero for abstract and native methods
    pub code_offset: u32,
}

impl MethodDescriptor {
    /// Formatted signature, e.g. `boolean equals(Object)`
    pub fn signature(&self) -> String {
        format_signature(&self.shorty, &self.name, self.return_type.as_deref())
    }

    /// Returns true if the method has a body
    pub fn has_code(&self) -> bool {
        self.code_offset != 0
    }
}

/// A class and its methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDescriptor {
    /// Internal name, e.g. `com/example/Foo`
    pub name: String,
    /// Type descriptor, e.g. `Lcom/example/Foo;`
    pub descriptor: String,
    /// `ACC_*` flags
    pub access_flags: u32,
    /// Internal name of the superclass, absent for `java/lang/Object`
    pub superclass: Option<String>,
    /// Direct methods (constructors, static and private) in declaration order
    pub direct_methods: Vec<MethodDescriptor>,
    /// Virtual methods in declaration order
    pub virtual_methods: Vec<MethodDescriptor>,
}

impl ClassDescriptor {
    /// Direct methods followed by virtual methods
    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.direct_methods.iter().chain(&self.virtual_methods)
    }

    /// First method named `name`, direct methods first
    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods().find(|m| m.name == name)
    }
}

/// Lists class names in container order
pub fn list_classes(data: &[u8]) -> Result<Vec<String>> {
    let dex = DexFile::parse(data)?;
    let names = (0..dex.class_count())
        .map(|index| dex.class_name(&dex.class_def(index)?))
        .collect::<Result<Vec<_>>>()?;
    debug!("Listed {} classes", names.len());
    Ok(names)
}

/// Finds the first class named `class_name` and decodes its methods
pub fn find_class(data: &[u8], class_name: &str) -> Result<ClassDescriptor> {
    let dex = DexFile::parse(data)?;
    let (def, name) = locate_class(&dex, class_name)?;

    let (direct, virtual_methods) = dex.class_methods(&def)?;
    let describe = |methods: Vec<EncodedMethod>| {
        methods
            .iter()
            .map(|m| describe_method(&dex, m))
            .collect::<Result<Vec<_>>>()
    };

    Ok(ClassDescriptor {
        name,
        descriptor: dex.type_at(def.class_idx)?,
        access_flags: def.access_flags,
        superclass: dex.superclass_name(&def)?,
        direct_methods: describe(direct)?,
        virtual_methods: describe(virtual_methods)?,
    })
}

/// Lists a class's methods, direct then virtual, each in declaration order.
/// A class without class data has no methods.
pub fn list_methods(data: &[u8], class_name: &str) -> Result<Vec<MethodDescriptor>> {
    let class = find_class(data, class_name)?;
    debug!(
        "Class '{}' has {} direct and {} virtual methods",
        class.name,
        class.direct_methods.len(),
        class.virtual_methods.len()
    );
    let ClassDescriptor {
        mut direct_methods,
        virtual_methods,
        ..
    } = class;
    direct_methods.extend(virtual_methods);
    Ok(direct_methods)
}

/// Decodes the body of `method_name` in `class_name`. A method without code
/// yields no instructions.
pub fn list_instructions(data: &[u8], class_name: &str, method_name: &str) -> Result<Vec<Instruction>> {
    let class = find_class(data, class_name)?;
    let method = class
        .find_method(method_name)
        .ok_or_else(|| Error::method_not_found(class_name, method_name))?;

    if !method.has_code() {
        debug!("Method '{}.{}' has no code", class_name, method_name);
        return Ok(Vec::new());
    }

    let dex = DexFile::parse(data)?;
    let units = dex.code_units(method.code_offset)?;
    let instructions = decode_instructions(&units, &dex, method.code_offset as usize)?;
    debug!(
        "Decoded {} instructions ({} code units) for '{}.{}'",
        instructions.len(),
        units.len(),
        class_name,
        method_name
    );
    Ok(instructions)
}

fn locate_class(dex: &DexFile<'_>, class_name: &str) -> Result<(ClassDef, String)> {
    for index in 0..dex.class_count() {
        let def = dex.class_def(index)?;
        let name = dex.class_name(&def)?;
        if name == class_name {
            return Ok((def, name));
        }
    }
    Err(Error::class_not_found(class_name))
}

fn describe_method(dex: &DexFile<'_>, method: &EncodedMethod) -> Result<MethodDescriptor> {
    let id = dex.method_at(method.method_idx)?;
    let proto = dex.proto_at(id.proto_idx as u32)?;
    Ok(MethodDescriptor {
        name: id.name,
        return_type: Some(internal_type_name(&proto.return_type)),
        shorty: proto.shorty,
        parameters: proto.parameters,
        access_flags: method.access_flags,
        code_offset: method.code_off,
    })
}

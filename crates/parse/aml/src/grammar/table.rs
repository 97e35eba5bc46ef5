//! The built-in ACPI 6.x opcode table.
//!
//! Name strings in term position (lead characters `A`-`Z`, `_`, `\`, `^`,
//! `.`, `/`) are recognised by the parser directly and have no entry here.

use super::{ArgFormat, Grammar, OpcodeDescriptor, OpcodeFlags};

const U8: ArgFormat = ArgFormat::UInt8;
const U16: ArgFormat = ArgFormat::UInt16;
const U32: ArgFormat = ArgFormat::UInt32;
const U64: ArgFormat = ArgFormat::UInt64;
const NAME: ArgFormat = ArgFormat::NameString;
const STR: ArgFormat = ArgFormat::String;
const OBJ: ArgFormat = ArgFormat::Object;
const SUP: ArgFormat = ArgFormat::SuperName;
const FPL: ArgFormat = ArgFormat::FieldPkgLen;

const NONE: OpcodeFlags = OpcodeFlags::empty();
const INT: OpcodeFlags = OpcodeFlags::INTEGER_CONST;
const NS: OpcodeFlags = OpcodeFlags::IN_NAMESPACE;
const PKG_CHILD: OpcodeFlags = OpcodeFlags::HAS_PKG_LENGTH.union(OpcodeFlags::HAS_CHILD_OBJ);
const PKG_BYTES: OpcodeFlags = OpcodeFlags::HAS_PKG_LENGTH.union(OpcodeFlags::HAS_BYTE_LIST);
const PKG_FIELDS: OpcodeFlags = OpcodeFlags::HAS_PKG_LENGTH.union(OpcodeFlags::HAS_FIELD_LIST);
const PKG_ELEMENTS: OpcodeFlags = PKG_CHILD.union(OpcodeFlags::PACKAGE_ELEMENTS);
const PKG_CHILD_NS: OpcodeFlags = PKG_CHILD.union(NS);
const METHOD: OpcodeFlags = PKG_CHILD_NS.union(OpcodeFlags::DEFINES_METHOD);

const fn op(
    name: &'static str,
    opcode: u8,
    args: &'static [ArgFormat],
    flags: OpcodeFlags,
) -> OpcodeDescriptor {
    OpcodeDescriptor::new(name, opcode, args, flags)
}

const fn ext(
    name: &'static str,
    sub: u8,
    args: &'static [ArgFormat],
    flags: OpcodeFlags,
) -> OpcodeDescriptor {
    OpcodeDescriptor::extended(name, sub, args, flags)
}

const ACPI_OPCODES: &[OpcodeDescriptor] = &[
    // Constants and data objects.
    op("Zero", 0x00, &[], INT),
    op("One", 0x01, &[], INT),
    op("Ones", 0xFF, &[], INT),
    op("BytePrefix", 0x0A, &[U8], INT),
    op("WordPrefix", 0x0B, &[U16], INT),
    op("DWordPrefix", 0x0C, &[U32], INT),
    op("StringPrefix", 0x0D, &[STR], NONE),
    op("QWordPrefix", 0x0E, &[U64], INT),
    op("Buffer", 0x11, &[OBJ], PKG_BYTES),
    op("Package", 0x12, &[U8], PKG_ELEMENTS),
    op("VarPackage", 0x13, &[OBJ], PKG_ELEMENTS),
    ext("Revision", 0x30, &[], NONE),
    ext("Debug", 0x31, &[], NONE),
    ext("Timer", 0x33, &[], NONE),
    // Namespace modifiers and named objects.
    op("Alias", 0x06, &[NAME, NAME], NS).with_name_index(1),
    op("Name", 0x08, &[NAME, OBJ], NS),
    op("Scope", 0x10, &[NAME], PKG_CHILD_NS),
    op("Method", 0x14, &[NAME, U8], METHOD),
    op("External", 0x15, &[NAME, U8, U8], NS),
    ext("Mutex", 0x01, &[NAME, U8], NS),
    ext("Event", 0x02, &[NAME], NS),
    ext("CreateField", 0x13, &[OBJ, OBJ, OBJ, NAME], NS).with_name_index(3),
    ext("OperationRegion", 0x80, &[NAME, U8, OBJ, OBJ], NS),
    ext("Field", 0x81, &[NAME, U8], PKG_FIELDS),
    ext("Device", 0x82, &[NAME], PKG_CHILD_NS),
    ext("Processor", 0x83, &[NAME, U8, U32, U8], PKG_CHILD_NS),
    ext("PowerResource", 0x84, &[NAME, U8, U16], PKG_CHILD_NS),
    ext("ThermalZone", 0x85, &[NAME], PKG_CHILD_NS),
    ext("IndexField", 0x86, &[NAME, NAME, U8], PKG_FIELDS),
    ext("BankField", 0x87, &[NAME, NAME, OBJ, U8], PKG_FIELDS),
    ext("DataTableRegion", 0x88, &[NAME, OBJ, OBJ, OBJ], NS),
    op("CreateDWordField", 0x8A, &[OBJ, OBJ, NAME], NS).with_name_index(2),
    op("CreateWordField", 0x8B, &[OBJ, OBJ, NAME], NS).with_name_index(2),
    op("CreateByteField", 0x8C, &[OBJ, OBJ, NAME], NS).with_name_index(2),
    op("CreateBitField", 0x8D, &[OBJ, OBJ, NAME], NS).with_name_index(2),
    op("CreateQWordField", 0x8F, &[OBJ, OBJ, NAME], NS).with_name_index(2),
    // Locals and arguments.
    op("Local0", 0x60, &[], NONE),
    op("Local1", 0x61, &[], NONE),
    op("Local2", 0x62, &[], NONE),
    op("Local3", 0x63, &[], NONE),
    op("Local4", 0x64, &[], NONE),
    op("Local5", 0x65, &[], NONE),
    op("Local6", 0x66, &[], NONE),
    op("Local7", 0x67, &[], NONE),
    op("Arg0", 0x68, &[], NONE),
    op("Arg1", 0x69, &[], NONE),
    op("Arg2", 0x6A, &[], NONE),
    op("Arg3", 0x6B, &[], NONE),
    op("Arg4", 0x6C, &[], NONE),
    op("Arg5", 0x6D, &[], NONE),
    op("Arg6", 0x6E, &[], NONE),
    // Expression opcodes.
    op("Store", 0x70, &[OBJ, SUP], NONE),
    op("RefOf", 0x71, &[SUP], NONE),
    op("Add", 0x72, &[OBJ, OBJ, SUP], NONE),
    op("Concatenate", 0x73, &[OBJ, OBJ, SUP], NONE),
    op("Subtract", 0x74, &[OBJ, OBJ, SUP], NONE),
    op("Increment", 0x75, &[SUP], NONE),
    op("Decrement", 0x76, &[SUP], NONE),
    op("Multiply", 0x77, &[OBJ, OBJ, SUP], NONE),
    op("Divide", 0x78, &[OBJ, OBJ, SUP, SUP], NONE),
    op("ShiftLeft", 0x79, &[OBJ, OBJ, SUP], NONE),
    op("ShiftRight", 0x7A, &[OBJ, OBJ, SUP], NONE),
    op("And", 0x7B, &[OBJ, OBJ, SUP], NONE),
    op("NAnd", 0x7C, &[OBJ, OBJ, SUP], NONE),
    op("Or", 0x7D, &[OBJ, OBJ, SUP], NONE),
    op("NOr", 0x7E, &[OBJ, OBJ, SUP], NONE),
    op("XOr", 0x7F, &[OBJ, OBJ, SUP], NONE),
    op("Not", 0x80, &[OBJ, SUP], NONE),
    op("FindSetLeftBit", 0x81, &[OBJ, SUP], NONE),
    op("FindSetRightBit", 0x82, &[OBJ, SUP], NONE),
    op("DerefOf", 0x83, &[OBJ], NONE),
    op("ConcatenateResTemplate", 0x84, &[OBJ, OBJ, SUP], NONE),
    op("Mod", 0x85, &[OBJ, OBJ, SUP], NONE),
    op("Notify", 0x86, &[SUP, OBJ], NONE),
    op("SizeOf", 0x87, &[SUP], NONE),
    op("Index", 0x88, &[OBJ, OBJ, SUP], NONE),
    op("Match", 0x89, &[OBJ, U8, OBJ, U8, OBJ, OBJ], NONE),
    op("ObjectType", 0x8E, &[SUP], NONE),
    op("LAnd", 0x90, &[OBJ, OBJ], NONE),
    op("LOr", 0x91, &[OBJ, OBJ], NONE),
    op("LNot", 0x92, &[OBJ], NONE),
    op("LEqual", 0x93, &[OBJ, OBJ], NONE),
    op("LGreater", 0x94, &[OBJ, OBJ], NONE),
    op("LLess", 0x95, &[OBJ, OBJ], NONE),
    op("ToBuffer", 0x96, &[OBJ, SUP], NONE),
    op("ToDecimalString", 0x97, &[OBJ, SUP], NONE),
    op("ToHexString", 0x98, &[OBJ, SUP], NONE),
    op("ToInteger", 0x99, &[OBJ, SUP], NONE),
    op("ToString", 0x9C, &[OBJ, OBJ, SUP], NONE),
    op("CopyObject", 0x9D, &[OBJ, SUP], NONE),
    op("Mid", 0x9E, &[OBJ, OBJ, OBJ, SUP], NONE),
    ext("CondRefOf", 0x12, &[SUP, SUP], NONE),
    ext("LoadTable", 0x1F, &[OBJ, OBJ, OBJ, OBJ, OBJ, OBJ], NONE),
    ext("Load", 0x20, &[NAME, SUP], NONE),
    ext("Stall", 0x21, &[OBJ], NONE),
    ext("Sleep", 0x22, &[OBJ], NONE),
    ext("Acquire", 0x23, &[SUP, U16], NONE),
    ext("Signal", 0x24, &[SUP], NONE),
    ext("Wait", 0x25, &[SUP, OBJ], NONE),
    ext("Reset", 0x26, &[SUP], NONE),
    ext("Release", 0x27, &[SUP], NONE),
    ext("FromBCD", 0x28, &[OBJ, SUP], NONE),
    ext("ToBCD", 0x29, &[OBJ, SUP], NONE),
    ext("Unload", 0x2A, &[SUP], NONE),
    ext("Fatal", 0x32, &[U8, U32, OBJ], NONE),
    // Statements.
    op("Continue", 0x9F, &[], NONE),
    op("If", 0xA0, &[OBJ], PKG_CHILD),
    op("Else", 0xA1, &[], PKG_CHILD),
    op("While", 0xA2, &[OBJ], PKG_CHILD),
    op("Noop", 0xA3, &[], NONE),
    op("Return", 0xA4, &[OBJ], NONE),
    op("Break", 0xA5, &[], NONE),
    op("BreakPoint", 0xCC, &[], NONE),
];

const ACPI_FIELD_ELEMENTS: &[OpcodeDescriptor] = &[
    op("ReservedField", 0x00, &[FPL], NONE),
    op("AccessField", 0x01, &[U8, U8], NONE),
    op("Connection", 0x02, &[SUP], NONE),
    op("ExtendedAccessField", 0x03, &[U8, U8, U8], NONE),
];

pub(super) static ACPI_GRAMMAR: Grammar = Grammar::new(ACPI_OPCODES, ACPI_FIELD_ELEMENTS);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes_are_unique() {
        for (i, a) in ACPI_OPCODES.iter().enumerate() {
            for b in &ACPI_OPCODES[i + 1..] {
                assert!(
                    !a.matches(b.opcode, b.sub_opcode),
                    "{} and {} share an encoding",
                    a.name,
                    b.name
                );
            }
        }
    }

    #[test]
    fn list_flags_are_exclusive() {
        let lists = [
            OpcodeFlags::HAS_CHILD_OBJ,
            OpcodeFlags::HAS_BYTE_LIST,
            OpcodeFlags::HAS_FIELD_LIST,
        ];
        for desc in ACPI_OPCODES {
            let count = lists.iter().filter(|flag| desc.has(**flag)).count();
            assert!(count <= 1, "{} has more than one list kind", desc.name);
            if count == 1 {
                assert!(desc.has(OpcodeFlags::HAS_PKG_LENGTH), "{}", desc.name);
            }
        }
    }

    #[test]
    fn integer_constants_use_integer_arguments() {
        for desc in ACPI_OPCODES.iter().filter(|d| d.has(INT)) {
            assert!(desc.arguments.iter().all(|a| a.integer_width().is_some()));
        }
        let qword = ACPI_GRAMMAR.lookup(0x0E, 0).map(|d| d.arguments);
        assert_eq!(qword, Some(&[U64][..]));
    }

    #[test]
    fn package_elements_imply_child_list() {
        let packages = ACPI_OPCODES.iter().filter(|d| d.has(OpcodeFlags::PACKAGE_ELEMENTS));
        assert_eq!(packages.clone().count(), 2);
        for desc in packages {
            assert!(desc.has(PKG_CHILD), "{}", desc.name);
        }
        let store = ACPI_GRAMMAR.by_name("Store").map(|d| d.arguments);
        assert_eq!(store, Some(&[OBJ, SUP][..]));
    }
}

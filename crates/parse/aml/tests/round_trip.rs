//! Parsing real-shaped tables and writing them back out.

mod common;

use hadron_aml::{
    ArgFormat, DataType, Grammar, NodeArena, OpcodeDescriptor, OpcodeFlags, Parser,
    ResourceDescriptor, TreeDump, parse_definition_block, sdt,
};

#[test]
fn dsdt_round_trips_byte_for_byte() {
    common::init_logging();
    let table = common::sample_dsdt();
    let mut arena = NodeArena::new();
    let root = parse_definition_block(&mut arena, &table).unwrap();

    assert_eq!(arena.header(root).unwrap().signature(), *b"DSDT");
    assert_eq!(arena.compute_size(root), Ok(table.len()));
    assert_eq!(arena.serialize(root).unwrap(), table);
}

#[test]
fn dsdt_namespace_is_navigable() {
    let table = common::sample_dsdt();
    let mut arena = NodeArena::new();
    let root = parse_definition_block(&mut arena, &table).unwrap();

    let sta = arena.find_node(root, "\\_SB.PCI0._STA").unwrap().unwrap();
    assert_eq!(arena.descriptor(sta).unwrap().name, "Method");
    assert_eq!(arena.absolute_path(sta).unwrap().unwrap().to_string(), "\\_SB_.PCI0._STA");

    let ret = arena.variable_arguments(sta).unwrap()[0];
    let value = arena.fixed_argument(ret, 0).unwrap().unwrap();
    assert_eq!(arena.integer_value(value), Ok(0x0F));

    // The invocation after the declaration picked up its single argument.
    let scope = arena.variable_arguments(root).unwrap()[0];
    let invoke = *arena.variable_arguments(scope).unwrap().last().unwrap();
    assert_eq!(arena.descriptor(invoke).unwrap().name, "MethodInvocation");
    let args = arena.variable_arguments(invoke).unwrap();
    assert_eq!(args.len(), 1);
    assert_eq!(arena.integer_value(args[0]), Ok(1));
}

#[test]
fn resource_template_is_split_into_descriptors() {
    let table = common::sample_dsdt();
    let mut arena = NodeArena::new();
    let root = parse_definition_block(&mut arena, &table).unwrap();

    let crs = arena.find_node(root, "\\_SB.PCI0._CRS").unwrap().unwrap();
    let buffer = arena.fixed_argument(crs, 1).unwrap().unwrap();
    let items = arena.variable_arguments(buffer).unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|&item| arena.data_type(item) == Ok(DataType::ResourceData)));
    assert_eq!(
        arena.decode_resource(items[0]),
        Ok(ResourceDescriptor::Io {
            base: 0x0CF8,
            max_base: 0x0CF8,
            alignment: 1,
            length: 8,
        })
    );
    assert_eq!(arena.decode_resource(items[1]), Ok(ResourceDescriptor::EndTag));
}

#[test]
fn edited_table_reparses_with_valid_checksum() {
    let table = common::sample_dsdt();
    let mut arena = NodeArena::new();
    let root = parse_definition_block(&mut arena, &table).unwrap();

    let pci = arena.find_node(root, "\\_SB.PCI0").unwrap().unwrap();
    arena.rename(pci, "PCI1").unwrap();
    let uid = arena.find_node(root, "\\_SB.PCI1._UID").unwrap().unwrap();
    let value = arena.fixed_argument(uid, 1).unwrap().unwrap();
    arena.set_integer_value(value, 0x1234).unwrap();
    hadron_aml::codegen::name_integer(&mut arena, Some(pci), "_ADR", 0x0001_0000).unwrap();

    let bytes = arena.serialize(root).unwrap();
    assert!(sdt::validate_checksum(&bytes));
    // Zero becomes a WordPrefix (+2), _ADR is new (+10) and the device body
    // outgrows a one-byte PkgLength (+1).
    assert_eq!(bytes.len(), table.len() + 2 + 10 + 1);

    let mut reparsed = NodeArena::new();
    let copy = parse_definition_block(&mut reparsed, &bytes).unwrap();
    let uid = reparsed.find_node(copy, "\\_SB.PCI1._UID").unwrap().unwrap();
    let value = reparsed.fixed_argument(uid, 1).unwrap().unwrap();
    assert_eq!(reparsed.integer_value(value), Ok(0x1234));
    let adr = reparsed.find_node(copy, "\\_SB.PCI1._ADR").unwrap().unwrap();
    let value = reparsed.fixed_argument(adr, 1).unwrap().unwrap();
    assert_eq!(reparsed.integer_value(value), Ok(0x0001_0000));
    assert_eq!(reparsed.serialize(copy).unwrap(), bytes);
}

#[test]
fn dump_lists_every_node() {
    let table = common::sample_dsdt();
    let mut arena = NodeArena::new();
    let root = parse_definition_block(&mut arena, &table).unwrap();
    let text = TreeDump::new(&arena, root).to_string();

    assert!(text.starts_with("DefinitionBlock DSDT\n  Scope\n    NameString \\_SB_\n"));
    assert_eq!(text.lines().count(), 1 + arena.descendants(root).count());
}

// A two-term stream under a minimal custom grammar: an opcode with a package
// length wrapping three raw bytes, followed by a one-byte opcode with a byte
// argument.
static OPCODES: &[OpcodeDescriptor] = &[
    OpcodeDescriptor::new(
        "OpA",
        0x01,
        &[],
        OpcodeFlags::HAS_PKG_LENGTH.union(OpcodeFlags::HAS_BYTE_LIST),
    ),
    OpcodeDescriptor::new("OpB", 0x02, &[ArgFormat::UInt8], OpcodeFlags::empty()),
];
static CUSTOM: Grammar = Grammar::new(OPCODES, &[]);

#[test]
fn custom_grammar_scenario() {
    let stream = [0x01, 0x04, 0x01, 0x02, 0x03, 0x02, 0x7F];
    let mut arena = NodeArena::new();
    let terms = Parser::new(&CUSTOM).parse_term_list(&mut arena, &stream).unwrap();
    assert_eq!(terms.len(), 2);

    let op_a = terms[0];
    assert_eq!(arena.package_length(op_a), Ok(4));
    let children = arena.variable_arguments(op_a).unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(arena.data_type(children[0]), Ok(DataType::Raw));
    assert_eq!(arena.data(children[0]).unwrap(), &[0x01, 0x02, 0x03]);

    let arg = arena.fixed_argument(terms[1], 0).unwrap().unwrap();
    assert_eq!(arena.data(arg).unwrap(), &[0x7F]);

    let mut out = Vec::new();
    for &term in &terms {
        arena.serialize_into(term, &mut out).unwrap();
    }
    assert_eq!(out, stream);
}

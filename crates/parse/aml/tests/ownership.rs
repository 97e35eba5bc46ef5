//! Clone, delete and allocation-failure behaviour over whole tables.

mod common;

use common::CountingAllocator;
use hadron_aml::{AmlError, DataType, Grammar, NodeArena, grammar, parse_definition_block};

fn parsed() -> (NodeArena<CountingAllocator>, hadron_aml::NodeId) {
    let table = common::sample_dsdt();
    let mut arena = NodeArena::with_allocator(CountingAllocator::default());
    let root = parse_definition_block(&mut arena, &table).unwrap();
    (arena, root)
}

#[test]
fn clones_are_independent() {
    let (mut arena, root) = parsed();
    let pci = arena.find_node(root, "\\_SB.PCI0").unwrap().unwrap();
    let original = arena.serialize(pci).unwrap();

    let copy = arena.clone_tree(pci).unwrap();
    assert_eq!(arena.parent(copy), Ok(None));
    assert_eq!(arena.serialize(copy).unwrap(), original);

    arena.rename(copy, "PCI9").unwrap();
    let hid = arena.variable_arguments(copy).unwrap()[0];
    let new_hid = hadron_aml::codegen::string(&mut arena, "ACPI0016").unwrap();
    let old_hid = arena.set_fixed_argument(hid, 1, Some(new_hid)).unwrap().unwrap();
    arena.delete_tree(old_hid).unwrap();
    assert_eq!(arena.serialize(pci).unwrap(), original);

    let edited = arena.serialize(copy).unwrap();
    assert_ne!(edited, original);
    let copy_of_copy = arena.clone_tree(copy).unwrap();
    assert_eq!(arena.serialize(copy_of_copy).unwrap(), edited);
}

#[test]
fn cloned_root_keeps_header() {
    let (mut arena, root) = parsed();
    let copy = arena.clone_tree(root).unwrap();
    assert!(arena.is_root_node(copy));
    assert_eq!(arena.header(copy), arena.header(root));
    assert_eq!(arena.serialize(copy).unwrap(), arena.serialize(root).unwrap());
}

#[test]
fn deleting_a_table_frees_everything() {
    let (mut arena, root) = parsed();
    let live = arena.len();
    assert_eq!(arena.allocator().outstanding, live);

    assert_eq!(arena.delete_tree(root), Ok(live));
    assert!(arena.is_empty());
    assert_eq!(arena.allocator().outstanding, 0);
    assert_eq!(arena.allocator().bytes, 0);
    assert!(!arena.is_valid(root));
}

#[test]
fn attached_subtree_cannot_be_deleted() {
    let (mut arena, root) = parsed();
    let pci = arena.find_node(root, "\\_SB.PCI0").unwrap().unwrap();
    assert_eq!(arena.delete_tree(pci), Err(AmlError::InvalidArgument));

    arena.detach(pci).unwrap();
    let freed = arena.delete_tree(pci).unwrap();
    assert!(freed > 1);
    assert_eq!(arena.find_node(root, "\\_SB.PCI0"), Ok(None));
    assert_eq!(arena.allocator().outstanding, arena.len());
}

#[test]
fn failed_clone_changes_nothing() {
    let (mut arena, root) = parsed();
    let before = arena.serialize(root).unwrap();
    let live = arena.len();

    let mut skip = 0;
    let copy = loop {
        let fail_at = arena.allocator().attempts + skip;
        arena.allocator_mut().fail_at = Some(fail_at);
        match arena.clone_tree(root) {
            Ok(copy) => break copy,
            Err(err) => {
                assert_eq!(err, AmlError::OutOfMemory, "failure after {skip} allocations");
                assert_eq!(arena.len(), live);
                assert_eq!(arena.allocator().outstanding, live);
                assert_eq!(arena.serialize(root).unwrap(), before);
            }
        }
        skip += 1;
    };

    assert_eq!(skip, live);
    assert_eq!(arena.serialize(copy).unwrap(), before);
}

#[test]
fn failed_parse_leaves_no_nodes() {
    let table = common::sample_dsdt();
    let mut arena = NodeArena::with_allocator(CountingAllocator::default());

    for fail_at in 0.. {
        arena.allocator_mut().attempts = 0;
        arena.allocator_mut().fail_at = Some(fail_at);
        match parse_definition_block(&mut arena, &table) {
            Ok(_) => break,
            Err(err) => {
                assert_eq!(err, AmlError::OutOfMemory);
                assert!(arena.is_empty());
                assert_eq!(arena.allocator().outstanding, 0);
            }
        }
    }
}

#[test]
fn fixed_argument_slots_match_every_descriptor() {
    let grammar = Grammar::acpi();
    let pseudo = [&grammar::METHOD_INVOCATION, &grammar::NAMED_FIELD];
    let descriptors = grammar
        .opcodes()
        .iter()
        .chain(grammar.field_elements())
        .chain(pseudo);

    let mut arena = NodeArena::new();
    for descriptor in descriptors {
        let name = descriptor.name;
        let node = arena.create_object_node(descriptor, 0).unwrap();
        let count = descriptor.arguments.len();
        assert_eq!(arena.fixed_argument_count(node), Ok(count), "{name}");

        let data = arena.create_data_node(DataType::Raw, &[0]).unwrap();
        for index in 0..count {
            assert_eq!(arena.fixed_argument(node, index), Ok(None), "{name} slot {index}");
            assert_eq!(arena.set_fixed_argument(node, index, Some(data)), Ok(None));
            assert_eq!(arena.fixed_argument(node, index), Ok(Some(data)));
            assert_eq!(arena.parent(data), Ok(Some(node)));
            assert_eq!(arena.set_fixed_argument(node, index, None), Ok(Some(data)));
            assert_eq!(arena.parent(data), Ok(None), "{name} slot {index}");
        }
        assert_eq!(arena.fixed_argument(node, count), Err(AmlError::InvalidArgument));
        assert_eq!(
            arena.set_fixed_argument(node, count, Some(data)),
            Err(AmlError::InvalidArgument),
            "{name}"
        );
        assert_eq!(arena.parent(data), Ok(None));
        arena.delete_tree(data).unwrap();
        arena.delete_tree(node).unwrap();
    }
    assert!(arena.is_empty());
}

mod common;

use common::Arena;
use docstore_debugger::{
    dump_lock_manager, lookup_thread_name, InspectionContext, LockManagerView,
    LockMode, RequestStatus, ResourceId,
};
use indoc::indoc;

const BASE: usize = 0x5100_0000;

const RES_COLLECTION: u64 = (3 << 60) | 777;
const RES_MUTEX: u64 = (5 << 60) | 1;
const RES_DATABASE_IDLE: u64 = (2 << 60) | 42;

/// Assemble a process image with a four-bucket lock table holding one
/// collection resource (one granted, one pending request), one mutex
/// resource, and one database resource with no grants.
fn lock_table_image() -> Arena {
    let mut arena = Arena::new(BASE, 0x1000);

    // Lock manager object and its bucket-count static.
    arena.put_ptr_to(0x000, 0x100);
    arena.put_u32(0x010, 4);
    arena.add_symbol("docstore::global_lock_manager", 0x000..0x008);
    arena.add_symbol("docstore::LockManager::kNumBuckets", 0x010..0x014);

    // Bucket heads.
    arena.put_ptr_to(0x100, 0x200);
    arena.put_ptr_to(0x110, 0x260);
    arena.put_ptr_to(0x118, 0x2C0);

    // Chain entries: {res_id, lock_head, next}.
    arena.put_u64(0x200, RES_COLLECTION);
    arena.put_ptr_to(0x208, 0x300);
    arena.put_u64(0x260, RES_MUTEX);
    arena.put_ptr_to(0x268, 0x360);
    arena.put_u64(0x2C0, RES_DATABASE_IDLE);
    arena.put_ptr_to(0x2C8, 0x3C0);

    // Lock heads: granted front/back, pending front/back, mode masks.
    arena.put_ptr_to(0x300, 0x400);
    arena.put_ptr_to(0x308, 0x400);
    arena.put_ptr_to(0x310, 0x440);
    arena.put_ptr_to(0x318, 0x440);
    arena.put_u32(0x320, 1 << 4);
    arena.put_u32(0x324, 1 << 3);

    arena.put_ptr_to(0x360, 0x480);
    arena.put_ptr_to(0x368, 0x480);
    arena.put_u32(0x380, 1 << 2);

    // 0x3C0 stays all-zero: a lock head with no granted requests.

    // Requests: {next, prev, locker_id, mode, status, count}.
    arena.put_u64(0x410, 7);
    arena.put_u32(0x418, 4);
    arena.put_u32(0x41C, 1);
    arena.put_u32(0x420, 1);

    arena.put_u64(0x450, 9);
    arena.put_u32(0x458, 3);
    arena.put_u32(0x45C, 2);
    arena.put_u32(0x460, 1);

    arena.put_u64(0x490, 7);
    arena.put_u32(0x498, 2);
    arena.put_u32(0x49C, 1);
    arena.put_u32(0x4A0, 2);

    // Resource catalog: one entry {res_id, std::string namespace}.
    arena.put_cxx_vector(0x500, 0x520, 40);
    arena.put_u64(0x520, RES_COLLECTION);
    arena.put_cxx_string(0x528, 0x560, "db.coll");
    arena.add_symbol("docstore::ResourceCatalog::instance", 0x500..0x518);

    // Mutex label registry: vector of std::string, indexed by hash.
    arena.put_cxx_vector(0x580, 0x5A0, 64);
    arena.put_cxx_string(0x5A0, 0x600, "Zero");
    arena.put_cxx_string(0x5C0, 0x610, "MyMutex");
    arena.add_symbol(
        "docstore::ResourceLabelRegistry::instance",
        0x580..0x598,
    );

    // Thread registry: one entry {tid, std::string name}.
    arena.put_cxx_vector(0x700, 0x720, 40);
    arena.put_u64(0x720, 7);
    arena.put_cxx_string(0x728, 0x760, "conn1");
    arena.add_symbol("docstore::ThreadRegistry::instance", 0x700..0x718);

    // Marks the binary as using the consolidated resource numbering.
    arena.add_symbol(
        "typeinfo for docstore::ResourceGlobalId",
        0x800..0x810,
    );

    arena
}

#[test]
fn locate_finds_the_standalone_global() {
    let snapshot = lock_table_image().into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    let lock_mgr = LockManagerView::locate(&reader).unwrap();
    assert_eq!(lock_mgr.num_buckets(), 4);
}

#[test]
fn only_resources_with_granted_requests_are_surfaced() {
    let snapshot = lock_table_image().into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    let lock_mgr = LockManagerView::locate(&reader).unwrap();
    let resources: Vec<_> = lock_mgr
        .resources(&reader)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let ids: Vec<_> = resources
        .iter()
        .map(|resource| resource.res_id.full_hash())
        .collect();
    assert_eq!(ids, [RES_COLLECTION, RES_MUTEX]);
}

#[test]
fn granted_and_pending_requests_are_reconstructed() {
    let snapshot = lock_table_image().into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    let lock_mgr = LockManagerView::locate(&reader).unwrap();
    let resources: Vec<_> = lock_mgr
        .resources(&reader)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    let granted: Vec<_> = resources[0]
        .lock_head
        .iter_granted(&reader)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(granted.len(), 1);
    assert_eq!(granted[0].locker_id(), 7);
    assert_eq!(granted[0].lock_mode(), LockMode::Exclusive);
    assert_eq!(granted[0].request_status(), RequestStatus::Granted);
    assert_eq!(granted[0].recursive_count(), 1);

    let pending: Vec<_> = resources[0]
        .lock_head
        .iter_pending(&reader)
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].locker_id(), 9);
    assert_eq!(pending[0].lock_mode(), LockMode::Shared);
    assert_eq!(pending[0].request_status(), RequestStatus::Waiting);
}

#[test]
fn resource_ids_decompose_and_resolve_names() {
    let snapshot = lock_table_image().into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    let collection = ResourceId::new(RES_COLLECTION);
    assert_eq!(collection.type_tag(), 3);
    assert_eq!(collection.hash_id(), 777);
    assert_eq!(
        collection.describe(&reader),
        format!("{{{RES_COLLECTION}: Collection, 777}}, db.coll"),
    );

    let mutex = ResourceId::new(RES_MUTEX);
    assert_eq!(
        mutex.describe(&reader),
        format!("{{{RES_MUTEX}: Mutex, 1}}, MyMutex"),
    );

    // Unresolvable resources keep their numeric rendering.
    let unknown = ResourceId::new((3 << 60) | 12345);
    let full = (3u64 << 60) | 12345;
    assert_eq!(
        unknown.describe(&reader),
        format!("{{{full}: Collection, 12345}}"),
    );
}

#[test]
fn legacy_catalog_is_consulted_when_newer_one_is_absent() {
    // Pre-consolidation numbering: no ResourceGlobalId typeinfo, and
    // the namespace map still lives in the collection catalog with
    // the entry fields in their old order.
    let res_database: u64 = (4 << 60) | 99;

    let mut arena = Arena::new(BASE, 0x1000);
    arena.put_cxx_vector(0x500, 0x520, 40);
    arena.put_cxx_string(0x520, 0x560, "legacy.db");
    arena.put_u64(0x540, res_database);
    arena.add_symbol("docstore::CollectionCatalog::instance", 0x500..0x518);

    let snapshot = arena.into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    let database = ResourceId::new(res_database);
    assert_eq!(
        database.describe(&reader),
        format!("{{{res_database}: Database, 99}}, legacy.db"),
    );
}

#[test]
fn thread_names_resolve_and_cache() {
    let snapshot = lock_table_image().into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    assert_eq!(lookup_thread_name(&reader, 7).as_deref(), Some("conn1"));
    assert_eq!(lookup_thread_name(&reader, 9), None);
    // Second resolution is served from the context cache.
    assert_eq!(lookup_thread_name(&reader, 7).as_deref(), Some("conn1"));
}

#[test]
fn dump_matches_server_dump_convention() {
    let snapshot = lock_table_image().into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    let lock_mgr = LockManagerView::locate(&reader).unwrap();
    let rendered = dump_lock_manager(&lock_mgr, &reader).unwrap();

    assert_eq!(
        rendered,
        format!(
            indoc! {r#"
                Lock manager dump
                {{{collection}: Collection, 777}}, db.coll
                  granted: MODE_X (STATUS_GRANTED) by locker 7 ("conn1"), count 1
                  pending: MODE_S (STATUS_WAITING) by locker 9, count 1
                {{{mutex}: Mutex, 1}}, MyMutex
                  granted: MODE_IX (STATUS_GRANTED) by locker 7 ("conn1"), count 2
            "#},
            collection = RES_COLLECTION,
            mutex = RES_MUTEX,
        )
    );
}

#[test]
fn empty_lock_table_gets_the_quiet_summary() {
    let mut arena = Arena::new(BASE, 0x200);
    arena.put_ptr_to(0x000, 0x100);
    arena.put_u32(0x010, 2);
    arena.add_symbol("docstore::global_lock_manager", 0x000..0x008);
    arena.add_symbol("docstore::LockManager::kNumBuckets", 0x010..0x014);

    let snapshot = arena.into_snapshot();
    let context = InspectionContext::new();
    let reader = context.reader(&snapshot);

    let lock_mgr = LockManagerView::locate(&reader).unwrap();
    assert_eq!(
        lock_mgr.summary(&reader),
        "Lock manager dump (no strong locks held or pending)",
    );
}

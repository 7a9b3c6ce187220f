//! Integration tests for decoding OpenNebula documents.
//!
//! The fixtures are pool and configuration documents as returned by `oned`,
//! CDATA sections and indentation included.

use goca::resource::FromXml;
use goca::resources::group::GroupPool;
use goca::resources::host::{HostPool, HostState};
use goca::resources::user::UserPool;
use goca::resources::vm::{LcmState, VirtualMachinePool, VmState};
use goca::{Permissions, Template, TemplateMap};
use std::fs;
use std::path::PathBuf;

/// Get the path to the test fixtures directory.
fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

fn load_fixture(name: &str) -> String {
    let fixture_path = fixtures_dir().join(name);
    fs::read_to_string(&fixture_path).unwrap_or_else(|e| {
        panic!(
            "Failed to read fixture at {}: {}",
            fixture_path.display(),
            e
        )
    })
}

#[test]
fn test_vm_pool() {
    let xml = load_fixture("vm_pool.xml");
    let pool = VirtualMachinePool::from_xml(&xml)
        .unwrap_or_else(|e| panic!("Failed to decode VM pool: {e}"));

    assert_eq!(pool.vms.len(), 2, "Expected 2 VMs in test data");

    let web = &pool.vms[0];
    assert_eq!(web.name, "web-frontend-0");
    assert_eq!(web.vm_state(), Some(VmState::Active));
    assert_eq!(web.lcm(), Some(LcmState::Running));
    assert_eq!(Permissions::from(web.permissions).octal(), Some(0o640));
    assert!(web.lock.is_none());

    let batch = &pool.vms[1];
    assert_eq!(batch.state_name(), "DONE");
    assert_eq!(batch.deploy_id, "");
    assert_eq!(batch.lock.as_ref().map(|l| l.owner), Some(2));
    let runtime = batch.end_time().unwrap() - batch.start_time().unwrap();
    assert_eq!(runtime.num_seconds(), 3600);
}

#[test]
fn test_vm_templates() {
    let xml = load_fixture("vm_pool.xml");
    let pool = VirtualMachinePool::from_xml(&xml).unwrap();
    let web = &pool.vms[0];

    assert_eq!(web.template.get_float("CPU").unwrap(), 0.5);
    assert_eq!(web.template.get_int("MEMORY").unwrap(), 1024);

    let nics = web.template.get_all("NIC");
    assert_eq!(nics.len(), 2, "Repeated NIC blocks must be preserved");
    assert_eq!(nics[0].get("NETWORK"), Some("private"));
    assert_eq!(nics[1].get("IP"), Some("192.0.2.12"));

    let context = web.template.get_unique("CONTEXT").unwrap();
    assert_eq!(
        context.get("START_SCRIPT"),
        Some("  echo \"hello\"  "),
        "CDATA content is kept verbatim"
    );

    assert_eq!(
        web.user_template.get_str("SCHED_REQUIREMENTS").unwrap(),
        "HYPERVISOR=\"kvm\""
    );
    assert!(pool.vms[1].user_template.is_empty());
}

#[test]
fn test_host_pool() {
    let xml = load_fixture("host_pool.xml");
    let pool = HostPool::from_xml(&xml).unwrap();

    assert_eq!(pool.hosts.len(), 2);

    let node = &pool.hosts[0];
    assert_eq!(node.host_state(), Some(HostState::Monitored));
    assert_eq!(node.im_mad, "kvm");
    assert_eq!(node.host_share.max_cpu, 800);
    assert_eq!(node.vms.ids, vec![12]);
    let pci = node.template.get_vectors("PCI");
    assert_eq!(pci.len(), 1);
    assert_eq!(pci[0][1], ("CLASS".to_string(), "0300".to_string()));

    let offline = &pool.hosts[1];
    assert_eq!(offline.host_state(), Some(HostState::Offline));
    assert_eq!(offline.cluster, "edge");
    assert_eq!(offline.host_share.running_vms, 0);
    assert!(offline.template.is_empty());
}

#[test]
fn test_config_decoding_modes() {
    let xml = load_fixture("system_config.xml");

    let pairs = Template::from_xml(&xml).unwrap();
    assert_eq!(pairs.get_all("PORT").len(), 2);
    assert!(pairs.get_str("PORT").is_err(), "Repeated key is not unique");
    let mads = pairs.get_vectors("VM_MAD");
    assert_eq!(mads.len(), 2);

    let map = TemplateMap::from_xml(&xml).unwrap();
    assert_eq!(map.get_str("PORT"), Some("2633"));
    assert_eq!(map.len(), 4);
    let last_mad = map.get("VM_MAD").and_then(|v| v.as_vector()).unwrap();
    assert!(last_mad.contains(&("NAME".to_string(), "lxc".to_string())));
}

#[test]
fn test_decoding_is_repeatable() {
    let xml = load_fixture("vm_pool.xml");
    let first = VirtualMachinePool::from_xml(&xml).unwrap();
    let second = VirtualMachinePool::from_xml(&xml).unwrap();
    assert_eq!(first, second);

    assert_eq!(
        first.vms[1].template.to_string(),
        "CPU=\"1\"\nMEMORY=\"512\""
    );
}

#[test]
fn test_user_pool_with_quotas() {
    let xml = load_fixture("user_pool.xml");
    let pool = UserPool::from_xml(&xml)
        .unwrap_or_else(|e| panic!("Failed to decode user pool: {e}"));

    let ids = pool.users.iter().map(|u| u.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(pool.quotas.len(), 2);

    let admin = &pool.users[0];
    assert!(admin.is_enabled());
    assert_eq!(admin.template.len(), 1);
    assert!(admin.template.get_str("TOKEN_PASSWORD").is_ok());

    let alice = &pool.users[1];
    assert_eq!(alice.name, "alice");
    assert!(!alice.is_enabled());
    assert_eq!(alice.groups.ids, vec![1, 100]);
    assert_eq!(alice.template.get_str("EMAIL").unwrap(), "alice@example.com");
    assert!(alice.template.get_str("TOKEN_PASSWORD").is_err());

    let quotas = pool.quotas_of(2).unwrap();
    assert_eq!(quotas.datastore_quota.datastores[0].size_used, 4096);
    assert_eq!(quotas.network_quota.networks[0].leases_used, 1);
    assert_eq!(quotas.image_quota.images[0].id, 3);
    let vm = quotas.vm_quota.vm.as_ref().unwrap();
    assert_eq!((vm.vms, vm.vms_used, vm.memory_used), (4, 1, 2048));

    let defaults = pool.default_quotas.vm_quota.vm.as_ref().unwrap();
    assert_eq!((defaults.memory, defaults.vms), (-2, 10));
}

#[test]
fn test_group_pool_with_quotas() {
    let xml = load_fixture("group_pool.xml");
    let pool = GroupPool::from_xml(&xml)
        .unwrap_or_else(|e| panic!("Failed to decode group pool: {e}"));

    let ids = pool.groups.iter().map(|g| g.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![0, 1, 100]);
    assert!(pool.groups[0].template.is_empty());
    assert!(pool.groups[1].template.is_empty());

    let developers = &pool.groups[2];
    assert_eq!(developers.admins.ids, vec![2]);
    let sunstone = developers.template.get_unique("SUNSTONE").unwrap();
    assert_eq!(sunstone.get("VIEWS"), Some("cloud,user"));

    let vm = pool.quotas_of(100).and_then(|q| q.vm_quota.vm.as_ref()).unwrap();
    assert_eq!((vm.memory, vm.vms), (32768, -1));
    assert!(pool.quotas_of(1).unwrap().vm_quota.vm.is_none());
    assert!(pool.default_quotas.vm_quota.vm.is_none());
}

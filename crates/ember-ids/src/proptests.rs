use crate::{FixedRegistry, Handle, IdRegistry};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Insert(u32),
    RemoveNth(usize),
    LookupNth(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<u32>().prop_map(Op::Insert),
        (0usize..64).prop_map(Op::RemoveNth),
        (0usize..64).prop_map(Op::LookupNth),
    ]
}

proptest! {
    /// The allocator never hands out 0 or a value that is currently live,
    /// and lookups always agree with a shadow model of the table.
    #[test]
    fn allocator_and_lookups_match_shadow_model(ops in proptest::collection::vec(op_strategy(), 1..128)) {
        let idm = IdRegistry::new();
        let mut live: Vec<(Handle, u32)> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(value) => {
                    let handle = idm.insert(value).unwrap();
                    prop_assert!(!handle.is_null(), "0 is reserved");
                    prop_assert!(
                        live.iter().all(|(h, _)| *h != handle),
                        "allocator reused a live handle"
                    );
                    live.push((handle, value));
                }
                Op::RemoveNth(n) => {
                    if live.is_empty() {
                        continue;
                    }
                    let (handle, _) = live.remove(n % live.len());
                    prop_assert!(idm.remove(handle));
                    prop_assert!(!idm.remove(handle), "double remove must miss");
                }
                Op::LookupNth(n) => {
                    if live.is_empty() {
                        continue;
                    }
                    let (handle, value) = live[n % live.len()];
                    let got = idm.get::<u32>(handle);
                    prop_assert_eq!(got.as_deref(), Some(&value));
                    let got_cached = idm.get_cached::<u32>(handle);
                    prop_assert_eq!(got_cached.as_deref(), Some(&value));
                }
            }
        }

        prop_assert_eq!(idm.len(), live.len());
        for (handle, value) in live {
            let got = idm.get::<u32>(handle);
            prop_assert_eq!(got.as_deref(), Some(&value));
        }
    }

    /// Install/remove cycles keep at most one live singleton per type.
    #[test]
    fn singleton_uniqueness(cycles in 1usize..16) {
        let fxm = FixedRegistry::new();
        for i in 0..cycles {
            let installed = fxm.install(i as u64).unwrap();
            prop_assert!(fxm.install(0u64).is_err());
            let got = fxm.get::<u64>();
            prop_assert_eq!(got.as_deref(), Some(&(i as u64)));
            prop_assert!(std::sync::Arc::ptr_eq(&installed, &fxm.get::<u64>().unwrap()));
            prop_assert!(fxm.remove::<u64>().is_some());
            prop_assert_eq!(fxm.get::<u64>(), None);
        }
    }
}

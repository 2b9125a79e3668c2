//! Symbol resolution under concurrency and partial availability.

use std::sync::{Arc, Barrier};
use std::thread;

use cfredir_layer::testing::FakeLoader;
use cfredir_layer::Symbol;

#[test]
fn test_concurrent_resolution_publishes_one_address() {
    let (loader, symbols) = FakeLoader::full();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let symbols = Arc::clone(&symbols);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                Symbol::ALL
                    .iter()
                    .map(|&s| symbols.resolve(s).map(|p| p.as_ptr() as usize))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let results: Vec<Vec<Option<usize>>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();
    for r in &results {
        assert_eq!(r, &results[0]);
        assert!(r.iter().all(Option::is_some));
    }

    // Published slots are never reloaded.
    for symbol in Symbol::ALL {
        let before = loader.load_count(symbol);
        assert!((1..=8).contains(&before));
        symbols.resolve(symbol);
        assert_eq!(loader.load_count(symbol), before);
    }
}

#[test]
fn test_absent_symbol_is_retried_until_found() {
    let (loader, symbols) = FakeLoader::without(&[Symbol::PathIsPrefixW]);

    assert!(symbols.resolve(Symbol::PathIsPrefixW).is_none());
    assert!(symbols.resolve(Symbol::PathIsPrefixW).is_none());
    assert!(!symbols.is_resolved(Symbol::PathIsPrefixW));
    assert_eq!(loader.load_count(Symbol::PathIsPrefixW), 2);

    loader.set_available(Symbol::PathIsPrefixW, true);
    let found = symbols.resolve(Symbol::PathIsPrefixW).unwrap();
    assert!(symbols.is_resolved(Symbol::PathIsPrefixW));

    // Once published, switching the loader off changes nothing.
    loader.set_available(Symbol::PathIsPrefixW, false);
    assert_eq!(symbols.resolve(Symbol::PathIsPrefixW), Some(found));
}

#[test]
fn test_resolve_all_requires_every_symbol() {
    let (_loader, symbols) = FakeLoader::without(&[Symbol::ShGetFolderPathW]);
    assert!(!symbols.resolve_all(&Symbol::ALL));
    assert!(symbols.resolve_all(&[Symbol::NtCreateFile, Symbol::PathAppendW]));
}

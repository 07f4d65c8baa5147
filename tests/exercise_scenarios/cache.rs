//! Store / get scenarios and the call bookkeeping they leave behind.

use stashkit::{DecodeStrategy, Decoded, Error, KeyValueClient, STORE_IDENTITY};

use crate::common::setup;

#[test]
fn hello_then_forty_two() {
    let (_, cache) = setup();

    let k1 = cache.store("hello").unwrap();
    assert_eq!(cache.get_as_text(&k1).unwrap(), Some("hello".to_string()));

    let k2 = cache.store(42).unwrap();
    assert_eq!(cache.get_as_integer(&k2).unwrap(), Some(42));

    assert_eq!(cache.get_as_text("nonexistent-key").unwrap(), None);
}

#[test]
fn mixed_values_decode_back() {
    let (_, cache) = setup();
    let cases = [
        (cache.store("foo").unwrap(), Decoded::Bytes(b"foo".to_vec())),
        (cache.store(&b"bar"[..]).unwrap(), Decoded::Bytes(b"bar".to_vec())),
        (cache.store(123).unwrap(), Decoded::Bytes(b"123".to_vec())),
        (cache.store(1.5).unwrap(), Decoded::Bytes(b"1.5".to_vec())),
    ];
    for (key, expected) in cases {
        assert_eq!(cache.get(&key, DecodeStrategy::Raw).unwrap(), Some(expected));
    }
}

#[test]
fn float_to_integer_is_a_decode_error() {
    let (_, cache) = setup();
    let key = cache.store(3.14).unwrap();
    assert!(matches!(
        cache.get_as_integer(&key),
        Err(Error::Decode { .. })
    ));
    assert_eq!(cache.get_as_float(&key).unwrap(), Some(3.14));
}

#[test]
fn three_stores_three_counts() {
    let (client, cache) = setup();
    cache.store(b"first".to_vec()).unwrap();
    cache.store(b"second".to_vec()).unwrap();
    cache.store(b"third".to_vec()).unwrap();

    assert_eq!(client.get(STORE_IDENTITY).unwrap(), Some(b"3".to_vec()));
    assert_eq!(cache.call_count(STORE_IDENTITY).unwrap(), 3);
    assert_eq!(client.list_length("Cache.store:inputs").unwrap(), 3);
    assert_eq!(client.list_length("Cache.store:outputs").unwrap(), 3);
}

#[test]
fn history_pairs_each_input_with_its_key() {
    let (client, cache) = setup();
    let key = cache.store("first").unwrap();

    assert_eq!(
        client.read_list_element("Cache.store:inputs", 0).unwrap(),
        Some(b"(\"first\",)".to_vec())
    );
    assert_eq!(
        client.read_list_element("Cache.store:outputs", 0).unwrap(),
        Some(key.as_str().as_bytes().to_vec())
    );
}

#[test]
fn reinitialize_wipes_previous_session() {
    let (client, cache) = setup();
    let key = cache.store("old").unwrap();

    let fresh = stashkit::InstrumentedCache::initialize(client).unwrap();
    assert_eq!(fresh.get_as_text(&key).unwrap(), None);
    assert_eq!(fresh.call_count(STORE_IDENTITY).unwrap(), 0);
}

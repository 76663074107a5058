//! Proptest generators for property-based testing.

use proptest::prelude::*;

use vigil_core::{Actor, ActorId, ActorType, CodeStub, KeyId, RsaEncryptionAlgorithm};
use vigil_policy::{LocalKeyStore, RecoveryRequest};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Generate a hex public key identifier, sometimes shorter than a fingerprint.
pub fn key_id() -> impl Strategy<Value = KeyId> {
    "[0-9a-f]{8,96}".prop_map(|s| KeyId::new(s).expect("pattern is non-empty"))
}

/// Generate an actor type.
pub fn actor_type() -> impl Strategy<Value = ActorType> {
    prop_oneof![
        Just(ActorType::Hcp),
        Just(ActorType::Patient),
        Just(ActorType::Device),
    ]
}

/// Generate an encryption algorithm.
pub fn algorithm() -> impl Strategy<Value = RsaEncryptionAlgorithm> {
    prop_oneof![
        Just(RsaEncryptionAlgorithm::OaepWithSha1),
        Just(RsaEncryptionAlgorithm::OaepWithSha256),
    ]
}

/// Generate an actor declaring up to `max_keys` keys.
pub fn actor(max_keys: usize) -> impl Strategy<Value = Actor> {
    (
        "[a-z]{1,8}-[0-9]{1,4}",
        actor_type(),
        prop::collection::vec((key_id(), algorithm()), 0..=max_keys),
    )
        .prop_map(|(id, actor_type, keys)| {
            keys.into_iter().fold(
                Actor::new(ActorId::new(id), actor_type),
                |actor, (key, alg)| actor.with_key(key, alg),
            )
        })
}

/// Generate a code stub.
pub fn code_stub() -> impl Strategy<Value = CodeStub> {
    ("[A-Z]{2,6}", "[A-Za-z0-9-]{1,12}", "[0-9]{1,2}")
        .prop_map(|(code_type, code, version)| CodeStub::new(code_type, code, version))
}

/// Generate an optional value-date window.
pub fn validity() -> impl Strategy<Value = (Option<i64>, Option<i64>)> {
    (any::<Option<i64>>(), any::<Option<i64>>())
}

/// A recovery scenario: requests plus a store holding some of the
/// requested keys and some unrelated ones.
#[derive(Debug, Clone)]
pub struct RecoveryScenario {
    pub requests: Vec<RecoveryRequest>,
    pub store: LocalKeyStore,
}

impl Arbitrary for RecoveryScenario {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            prop::collection::vec(
                (actor(4), prop::collection::vec((key_id(), any::<bool>()), 0..6)),
                0..4,
            ),
            prop::collection::vec(
                (key_id(), prop::collection::vec(any::<u8>(), 1..64)),
                0..4,
            ),
        )
            .prop_map(|(actors, unrelated)| {
                let mut stored = std::collections::BTreeMap::new();
                let mut requests = Vec::with_capacity(actors.len());

                for (actor, wanted) in actors {
                    let mut unavailable = Vec::with_capacity(wanted.len());
                    for (key, in_store) in wanted {
                        if in_store {
                            stored.insert(key.as_str().to_string(), STANDARD.encode(key.as_str()));
                        }
                        unavailable.push(key);
                    }
                    requests.push(RecoveryRequest::new(actor, unavailable));
                }
                for (key, material) in unrelated {
                    stored
                        .entry(key.as_str().to_string())
                        .or_insert_with(|| STANDARD.encode(material));
                }

                RecoveryScenario {
                    requests,
                    store: LocalKeyStore::new(stored),
                }
            })
            .boxed()
    }
}

use argonbox::engine::RawParams;
use argonbox::marshal::Transaction;
use argonbox::{
    Algorithm, EncodedHash, Engine, Error, Hasher, NativeEngine, Parameters, PartialParameters,
    Version,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn cheap(algorithm: Algorithm, version: Version) -> Parameters {
    Parameters {
        algorithm,
        memory_cost: 8,
        time_cost: 1,
        parallelism_cost: 1,
        version,
        output_length: 32,
    }
}

fn all_configurations() -> impl Iterator<Item = Parameters> {
    Algorithm::ALL
        .into_iter()
        .flat_map(|a| Version::ALL.into_iter().map(move |v| cheap(a, v)))
}

/// `$algo$v=ver$m=M,t=T,p=P$salt$digest`, split into its six segments.
fn segments(encoded: &str) -> Vec<&str> {
    assert!(!encoded.chars().any(char::is_whitespace), "{encoded}");
    let parts: Vec<&str> = encoded.split('$').collect();
    assert_eq!(parts.len(), 6, "{encoded}");
    assert_eq!(parts[0], "");
    parts
}

#[test]
fn round_trip_for_every_algorithm_and_version() {
    init_logging();
    let hasher = Hasher::new(NativeEngine::new());

    for params in all_configurations() {
        let encoded = hasher.hash_with("password", params).unwrap().to_string();
        assert!(hasher.verify("password", &encoded).unwrap(), "{encoded}");
    }
}

#[test]
fn different_password_does_not_verify() {
    let hasher = Hasher::new(NativeEngine::new());

    for params in all_configurations() {
        let encoded = hasher.hash_with("password", params).unwrap().to_string();
        assert!(!hasher.verify("passwore", &encoded).unwrap(), "{encoded}");
        assert!(!hasher.verify("", &encoded).unwrap(), "{encoded}");
    }
}

#[test]
fn empty_and_unicode_passwords_round_trip() {
    let hasher = Hasher::new(NativeEngine::new());
    let params = cheap(Algorithm::Argon2id, Version::V0x13);

    for password in ["", "pässwörd", "密码 with spaces\n"] {
        let encoded = hasher.hash_with(password, params).unwrap().to_string();
        assert!(hasher.verify(password, &encoded).unwrap());
    }
}

#[test]
fn tampering_never_verifies() {
    let hasher = Hasher::new(NativeEngine::new());
    let encoded = hasher
        .hash_with("password", cheap(Algorithm::Argon2id, Version::V0x13))
        .unwrap()
        .to_string();

    let parts = segments(&encoded);
    let salt_start = encoded.len() - parts[5].len() - 1 - parts[4].len();
    let digest_start = encoded.len() - parts[5].len();

    let mut positions = Vec::new();
    for (start, len) in [(salt_start, parts[4].len()), (digest_start, parts[5].len())] {
        positions.extend([start, start + len / 2, start + len - 1]);
    }

    for pos in positions {
        let mut bytes = encoded.clone().into_bytes();
        bytes[pos] = if bytes[pos] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(bytes).unwrap();

        match hasher.verify("password", &tampered) {
            Ok(false) | Err(Error::EngineFault(_)) => {}
            other => panic!("tampered hash {tampered} gave {other:?}"),
        }
    }
}

#[test]
fn encoding_shape_matches_grammar() {
    let hasher = Hasher::new(NativeEngine::new());

    for params in all_configurations() {
        let encoded = hasher.hash_with("password", params).unwrap().to_string();
        let parts = segments(&encoded);

        assert_eq!(parts[1], params.algorithm.name());
        assert_eq!(parts[2], format!("v={}", params.version as u32));
        assert_eq!(parts[3], "m=256,t=1,p=1");
        assert_eq!(parts[4].len(), 22);
        assert_eq!(parts[5].len(), 43);
        assert!(!parts[4].contains('=') && !parts[5].contains('='));

        let parsed: EncodedHash = encoded.parse().unwrap();
        assert_eq!(parsed.parameters(), Some(params));
    }
}

#[test]
fn defaults_are_embedded() {
    let encoded = argonbox::hash("password").unwrap().to_string();
    let parts = segments(&encoded);

    assert_eq!(parts[1], "argon2id");
    assert_eq!(parts[2], "v=19");
    assert_eq!(parts[3], "m=4096,t=3,p=1");
    assert!(argonbox::verify("password", &encoded).unwrap());
}

#[test]
fn partial_parameters_keep_remaining_defaults() {
    let hasher = Hasher::new(NativeEngine::new());
    let partial = PartialParameters {
        memory_cost: Some(9),
        time_cost: Some(1),
        ..Default::default()
    };

    let encoded = hasher.hash_with("password", partial).unwrap();
    assert_eq!(encoded.algorithm(), Algorithm::Argon2id);
    assert_eq!(encoded.version(), Version::V0x13);
    assert_eq!(encoded.memory(), 512);
    assert_eq!(encoded.parallelism_cost(), 1);
    assert_eq!(encoded.digest().len(), 32);
}

#[test]
fn salt_is_fresh_per_call() {
    let hasher = Hasher::new(NativeEngine::new());
    let params = cheap(Algorithm::Argon2id, Version::V0x13);

    let a = hasher.hash_with("password", params).unwrap();
    let b = hasher.hash_with("password", params).unwrap();

    assert_ne!(a.salt(), b.salt());
    assert_ne!(a.digest(), b.digest());
    assert_eq!(a.salt().len(), argonbox::SALT_LEN);
}

fn raw_digest(engine: &mut NativeEngine, params: &Parameters) -> Vec<u8> {
    let mut txn = Transaction::begin(engine);
    let password = txn.write(b"password").unwrap();
    let salt = txn.write(b"fixedsalt0123456").unwrap();
    let output = txn.hash(&password, &salt, RawParams::from(params)).unwrap();
    txn.read(&output).unwrap()
}

#[test]
fn version_selector_changes_digest() {
    let mut engine = NativeEngine::new();

    for algorithm in Algorithm::ALL {
        let v10 = raw_digest(&mut engine, &cheap(algorithm, Version::V0x10));
        let v13 = raw_digest(&mut engine, &cheap(algorithm, Version::V0x13));
        assert_ne!(v10, v13, "{algorithm}");
    }
    assert_eq!(engine.in_use(), 0);
}

#[test]
fn engine_memory_returns_to_baseline() {
    init_logging();
    let hasher = Hasher::new(NativeEngine::new());
    let params = cheap(Algorithm::Argon2id, Version::V0x13);

    let encoded = hasher.hash_with("password", params).unwrap().to_string();
    hasher.verify("password", &encoded).unwrap();
    let _ = hasher.verify("password", "$argon2id$broken");
    let high_water = hasher.with_engine(|e| e.high_water()).unwrap();

    for _ in 0..25 {
        let encoded = hasher.hash_with("password", params).unwrap().to_string();
        assert!(hasher.verify("password", &encoded).unwrap());
        let _ = hasher.verify("password", "$argon2id$broken");
    }

    hasher
        .with_engine(|e| {
            assert_eq!(e.in_use(), 0);
            assert_eq!(e.high_water(), high_water);

            let ptr = e.allocate(64);
            assert!(!ptr.is_null());
            assert!(ptr.offset() < high_water);
            e.deallocate(ptr, 64).unwrap();
        })
        .unwrap();
}

#[test]
fn concurrent_callers_are_serialised() {
    let hasher = Hasher::new(NativeEngine::new());
    let params = cheap(Algorithm::Argon2id, Version::V0x13);

    std::thread::scope(|s| {
        for i in 0..4 {
            let hasher = &hasher;
            s.spawn(move || {
                let password = format!("password-{i}");
                for _ in 0..3 {
                    let encoded = hasher.hash_with(&password, params).unwrap().to_string();
                    assert!(hasher.verify(&password, &encoded).unwrap());
                    assert!(!hasher.verify("other", &encoded).unwrap());
                }
            });
        }
    });

    assert_eq!(hasher.with_engine(|e| e.in_use()).unwrap(), 0);
}

#[test]
fn interoperates_with_argon2_crate() {
    use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

    let hasher = Hasher::new(NativeEngine::new());

    let ours = hasher
        .hash_with("password", cheap(Algorithm::Argon2i, Version::V0x10))
        .unwrap()
        .to_string();
    let parsed = PasswordHash::new(&ours).unwrap();
    assert!(argon2::Argon2::default().verify_password(b"password", &parsed).is_ok());
    assert_eq!(parsed.to_string(), ours);

    let salt = SaltString::from_b64("c29tZXNhbHRzb21lc2FsdA").unwrap();
    let argon = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(256, 1, 1, None).unwrap(),
    );
    let theirs = argon.hash_password(b"password", &salt).unwrap().to_string();
    assert!(hasher.verify("password", &theirs).unwrap());
    assert!(!hasher.verify("Password", &theirs).unwrap());
}

#[test]
fn documented_scenario() {
    let params = Parameters {
        algorithm: Algorithm::Argon2id,
        memory_cost: 16,
        time_cost: 4,
        parallelism_cost: 1,
        version: Version::V0x13,
        output_length: 32,
    };

    let encoded = argonbox::hash_with("password", params).unwrap().to_string();
    assert!(encoded.starts_with("$argon2id$v=19$m=65536,t=4,p=1$"));
    assert!(argonbox::verify("password", &encoded).unwrap());
    assert!(!argonbox::verify("wrong-password", &encoded).unwrap());
}

#[test]
fn out_of_range_memory_cost_is_an_engine_fault() {
    let hasher = Hasher::new(NativeEngine::new());
    let partial = PartialParameters {
        memory_cost: Some(40),
        ..Default::default()
    };

    match hasher.hash_with("password", partial) {
        Err(Error::EngineFault(msg)) => assert!(msg.contains("exceeds engine limit"), "{msg}"),
        other => panic!("expected EngineFault, got: {other:?}"),
    }
    assert_eq!(hasher.with_engine(|e| e.in_use()).unwrap(), 0);
}

#[test]
fn stored_hash_beyond_memory_limit_is_an_engine_fault() {
    let hasher = Hasher::new(NativeEngine::new().with_max_memory_cost(12));
    let stored = "$argon2id$v=19$m=4194304,t=1,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    match hasher.verify("pw", stored) {
        Err(Error::EngineFault(msg)) => assert!(msg.contains("exceeds engine limit"), "{msg}"),
        other => panic!("expected EngineFault, got: {other:?}"),
    }
    assert_eq!(hasher.with_engine(|e| e.in_use()).unwrap(), 0);

    let within = hasher
        .hash_with("pw", cheap(Algorithm::Argon2id, Version::V0x13))
        .unwrap()
        .to_string();
    assert!(hasher.verify("pw", &within).unwrap());
}

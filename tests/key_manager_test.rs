use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::{rngs::OsRng, RngCore};

use de_keys::{KeyManager, KEY_BUNDLE_STORAGE_KEY};
use ds::{
    InMemoryPersistence, InMemoryTransport, NetworkPersistence, Persistence, PrefixedPersistence,
    PRIVATE_STORE_NAMESPACE,
};
use keys_crypto::{
    DeviceSigner, LocalWalletSigner, PrivateKeyBundle, SignedEciesCiphertext, WalletSigner,
};

fn random_secret() -> [u8; 32] {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    secret
}

#[tokio::test]
async fn store_load_round_trip() {
    let signer: Arc<dyn WalletSigner> = Arc::new(LocalWalletSigner::random());
    let persistence: Arc<dyn Persistence> = Arc::new(PrefixedPersistence::new(
        PRIVATE_STORE_NAMESPACE,
        Arc::new(InMemoryPersistence::new()),
    ));
    let manager = KeyManager::new(signer.clone(), persistence);

    assert!(manager
        .load_private_key_bundle()
        .await
        .expect("load failed")
        .is_none());

    let bundle = PrivateKeyBundle::generate(&*signer)
        .await
        .expect("failed to generate bundle");
    manager
        .store_private_key_bundle(&bundle)
        .await
        .expect("failed to store bundle");

    let loaded = manager
        .load_private_key_bundle()
        .await
        .expect("load failed")
        .expect("bundle missing after store");
    assert_eq!(loaded.public_bundle(), bundle.public_bundle());
    assert_eq!(
        loaded.identity_key.secret_bytes(),
        bundle.identity_key.secret_bytes()
    );
}

#[tokio::test]
async fn notifier_fires_exactly_once_per_store() {
    let signer: Arc<dyn WalletSigner> = Arc::new(LocalWalletSigner::random());
    let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());

    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    let manager = KeyManager::new(signer.clone(), persistence).with_notifier(Box::new(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let bundle = PrivateKeyBundle::generate(&*signer)
        .await
        .expect("failed to generate bundle");
    manager
        .store_private_key_bundle(&bundle)
        .await
        .expect("failed to store bundle");
    assert_eq!(notified.load(Ordering::SeqCst), 1);

    manager
        .load_private_key_bundle()
        .await
        .expect("load failed");
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bundle_written_by_one_signer_is_readable_by_another_with_the_same_secret() {
    let secret = random_secret();
    let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());

    let local: Arc<dyn WalletSigner> =
        Arc::new(LocalWalletSigner::from_secret_bytes(secret).expect("failed to build signer"));
    let writer = KeyManager::new(local.clone(), persistence.clone());
    let bundle = PrivateKeyBundle::generate(&*local)
        .await
        .expect("failed to generate bundle");
    writer
        .store_private_key_bundle(&bundle)
        .await
        .expect("failed to store bundle");

    // A hardware-shaped signer holding the identical key decrypts fine.
    let device: Arc<dyn WalletSigner> =
        Arc::new(DeviceSigner::connect("ledger-ish", secret).expect("failed to connect device"));
    let reader = KeyManager::new(device, persistence.clone());
    let loaded = reader
        .load_private_key_bundle()
        .await
        .expect("load failed")
        .expect("bundle missing");
    assert_eq!(loaded.public_bundle(), bundle.public_bundle());

    // A device wrapping a different secret fails closed.
    let stranger: Arc<dyn WalletSigner> = Arc::new(
        DeviceSigner::connect("wrong-device", random_secret()).expect("failed to connect device"),
    );
    let wrong = KeyManager::new(stranger, persistence);
    let result = wrong.load_private_key_bundle().await;
    match result {
        Err(e) => assert!(e.is_integrity_error(), "unexpected error kind: {e}"),
        Ok(v) => panic!("expected integrity error, got {:?}", v.map(|b| b.version())),
    }
}

#[tokio::test]
async fn polling_observes_a_concurrent_store_before_the_deadline() {
    let secret = random_secret();
    let transport = Arc::new(InMemoryTransport::new());

    let storing_signer: Arc<dyn WalletSigner> =
        Arc::new(LocalWalletSigner::from_secret_bytes(secret).expect("failed to build signer"));
    let storing_persistence: Arc<dyn Persistence> =
        Arc::new(NetworkPersistence::new(transport.clone(), PRIVATE_STORE_NAMESPACE));
    let storing_manager = KeyManager::new(storing_signer.clone(), storing_persistence);

    let polling_signer: Arc<dyn WalletSigner> =
        Arc::new(LocalWalletSigner::from_secret_bytes(secret).expect("failed to build signer"));
    let polling_persistence: Arc<dyn Persistence> =
        Arc::new(NetworkPersistence::new(transport, PRIVATE_STORE_NAMESPACE));
    let polling_manager = KeyManager::new(polling_signer, polling_persistence);

    let bundle = PrivateKeyBundle::generate(&*storing_signer)
        .await
        .expect("failed to generate bundle");
    let expected = bundle.public_bundle();

    // The store lands only after the first few polls have seen absence.
    let writer = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(700)).await;
        storing_manager
            .store_private_key_bundle(&bundle)
            .await
            .expect("failed to store bundle");
    });

    let loaded = polling_manager
        .load_private_key_bundle_with_deadline(Duration::from_secs(10))
        .await
        .expect("polling failed")
        .expect("bundle not observed before deadline");
    assert_eq!(loaded.public_bundle(), expected);

    writer.await.expect("writer task failed");
}

#[tokio::test]
async fn polling_gives_up_at_the_deadline_when_nothing_is_stored() {
    let signer: Arc<dyn WalletSigner> = Arc::new(LocalWalletSigner::random());
    let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());
    let manager = KeyManager::new(signer, persistence);

    let loaded = manager
        .load_private_key_bundle_with_deadline(Duration::from_millis(300))
        .await
        .expect("polling failed");
    assert!(loaded.is_none());
}

#[tokio::test]
async fn tampered_stored_bundle_raises_an_integrity_error() {
    let signer: Arc<dyn WalletSigner> = Arc::new(LocalWalletSigner::random());
    let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());
    let manager = KeyManager::new(signer.clone(), persistence.clone());

    let bundle = PrivateKeyBundle::generate(&*signer)
        .await
        .expect("failed to generate bundle");
    manager
        .store_private_key_bundle(&bundle)
        .await
        .expect("failed to store bundle");

    let raw = persistence
        .get(KEY_BUNDLE_STORAGE_KEY)
        .await
        .expect("get failed")
        .expect("stored bundle missing");
    let mut ciphertext: SignedEciesCiphertext =
        serde_json::from_slice(&raw).expect("failed to parse stored ciphertext");
    ciphertext.mac[0] ^= 0x01;
    persistence
        .set(
            KEY_BUNDLE_STORAGE_KEY,
            &serde_json::to_vec(&ciphertext).expect("json"),
        )
        .await
        .expect("set failed");

    let result = manager.load_private_key_bundle().await;
    match result {
        Err(e) => assert!(e.is_integrity_error(), "unexpected error kind: {e}"),
        Ok(_) => panic!("tampered ciphertext must not decrypt"),
    }
}

#[tokio::test]
async fn get_or_create_is_stable_across_managers() {
    let secret = random_secret();
    let persistence: Arc<dyn Persistence> = Arc::new(InMemoryPersistence::new());

    let first: Arc<dyn WalletSigner> =
        Arc::new(LocalWalletSigner::from_secret_bytes(secret).expect("failed to build signer"));
    let created = KeyManager::new(first, persistence.clone())
        .get_or_create_bundle()
        .await
        .expect("failed to create bundle");

    let second: Arc<dyn WalletSigner> =
        Arc::new(LocalWalletSigner::from_secret_bytes(secret).expect("failed to build signer"));
    let fetched = KeyManager::new(second, persistence)
        .get_or_create_bundle()
        .await
        .expect("failed to fetch bundle");

    assert_eq!(created.public_bundle(), fetched.public_bundle());
}

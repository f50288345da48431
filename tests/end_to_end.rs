//! End-to-end scenarios spanning key derivation, metadata encryption,
//! and publish coordination against the in-memory transport fakes.
//!
//! Each test plays out one of the life-cycle scenarios a real client
//! would drive through this crate's public API: a fresh vault's first
//! publish, a content-only update that never touches the folder's own
//! Name, share-then-modify propagation, and a tampered record getting
//! rejected by the verifier rather than the relay.

use std::sync::Arc;

use cipherbox_core::config::Environment;
use cipherbox_core::ipns::{derive_name, parse_record, verify_record, Verification};
use cipherbox_core::keys::{derive_folder_keypair, derive_root_folder_key, derive_root_folder_keypair};
use cipherbox_core::metadata::{
    decrypt_file_metadata, decrypt_folder_metadata, encrypt_file_metadata, encrypt_folder_metadata,
    EncryptionMode, FileMetadata, FilePointer, FolderChild, FolderMetadata, FolderPointer,
};
use cipherbox_core::publish::PublishCoordinator;
use cipherbox_core::transport::{FakeNameRelay, NameRelay};

fn root_secret() -> [u8; 32] {
    [9u8; 32]
}

#[tokio::test]
async fn fresh_vault_publishes_an_empty_root_folder() {
    let root = root_secret();
    let env = Environment::Local;

    let root_folder_key = derive_root_folder_key(&root, env).unwrap();
    let root_keypair = derive_root_folder_keypair(&root, env).unwrap();

    let metadata = FolderMetadata::new();
    let envelope = encrypt_folder_metadata(&metadata, &root_folder_key).unwrap();
    let cid = format!("bafyroot{}", envelope.data.len());

    let relay = Arc::new(FakeNameRelay::new());
    let coordinator = PublishCoordinator::new(relay.clone());

    let sequence = coordinator
        .publish_one(&root_keypair.name, &root_keypair.signing_key, &cid)
        .await
        .unwrap();
    assert_eq!(sequence, 1);

    let resolved = relay.resolve(&root_keypair.name).await.unwrap();
    let parsed = parse_record(&resolved.record_bytes).unwrap();
    assert_eq!(verify_record(&parsed), Verification::Verified);
    assert_eq!(parsed.value.as_deref(), Some(format!("/ipfs/{}", cid).as_str()));

    // The root folder's key is a pure function of the root secret, so a
    // second derivation (e.g. a different device logging into the same
    // vault) recovers the exact same key and can decrypt what the first
    // one published.
    let root_folder_key_again = derive_root_folder_key(&root, env).unwrap();
    let recovered = decrypt_folder_metadata(&envelope, &root_folder_key_again).unwrap();
    assert!(recovered.children.is_empty());
}

#[tokio::test]
async fn content_update_does_not_require_a_folder_publish() {
    // Uploading a new file version only touches the file's own per-file
    // Name; the parent folder's Name (and its sequence counter) is
    // untouched as long as the folder's child list doesn't change shape
    // (same FilePointer, same fileMetaName).
    let root = root_secret();
    let env = Environment::Local;
    let folder_key = derive_root_folder_key(&root, env).unwrap();
    let folder_keypair = derive_root_folder_keypair(&root, env).unwrap();

    let file_keypair = derive_folder_keypair(&root, env, "file-0000000001").unwrap();

    let metadata = FolderMetadata {
        version: "v2".to_string(),
        children: vec![FolderChild::File(FilePointer {
            id: "file-0000000001".to_string(),
            name: "notes.txt".to_string(),
            file_meta_name: file_keypair.name.as_str().to_string(),
            created_at: 1,
            modified_at: 1,
        })],
    };
    let folder_envelope = encrypt_folder_metadata(&metadata, &folder_key).unwrap();
    let folder_cid = "bafyfolderv1".to_string();

    let relay = Arc::new(FakeNameRelay::new());
    let coordinator = PublishCoordinator::new(relay.clone());

    let folder_seq = coordinator
        .publish_one(&folder_keypair.name, &folder_keypair.signing_key, &folder_cid)
        .await
        .unwrap();

    let file_key = [11u8; 32];
    let file_meta_v1 = FileMetadata {
        version: "v1".to_string(),
        cid: "bafycontentv1".to_string(),
        file_key_encrypted: "aa".repeat(85),
        file_iv: "00".repeat(12),
        size: 100,
        mime_type: "text/plain".to_string(),
        encryption_mode: EncryptionMode::Gcm,
        created_at: 1,
        modified_at: 1,
    };
    let file_envelope_v1 = encrypt_file_metadata(&file_meta_v1, &folder_key).unwrap();
    let file_cid_v1 = "bafyfilemetav1".to_string();
    let file_seq_1 = coordinator
        .publish_one(&file_keypair.name, &file_keypair.signing_key, &file_cid_v1)
        .await
        .unwrap();

    // New content lands, file metadata points at a new content CID, but
    // nothing about the folder's child list changed.
    let mut file_meta_v2 = file_meta_v1.clone();
    file_meta_v2.cid = "bafycontentv2".to_string();
    file_meta_v2.modified_at = 2;
    let file_envelope_v2 = encrypt_file_metadata(&file_meta_v2, &folder_key).unwrap();
    let file_cid_v2 = "bafyfilemetav2".to_string();
    let file_seq_2 = coordinator
        .publish_one(&file_keypair.name, &file_keypair.signing_key, &file_cid_v2)
        .await
        .unwrap();

    assert_eq!(file_seq_1 + 1, file_seq_2);
    // The folder's own cached sequence is exactly what it was after its
    // one and only publish: the two file-content publishes never touched it.
    let folder_seq_after = coordinator.cached_sequence(&folder_keypair.name).await;
    assert_eq!(folder_seq_after, Some(folder_seq));

    let _ = decrypt_file_metadata(&file_envelope_v1, &folder_key).unwrap();
    let recovered_v2 = decrypt_file_metadata(&file_envelope_v2, &folder_key).unwrap();
    assert_eq!(recovered_v2.cid, "bafycontentv2");
}

#[tokio::test]
async fn sharing_a_folder_lets_the_recipient_decrypt_its_children() {
    use cipherbox_core::share::{create_share, ItemType};

    let root = root_secret();
    let env = Environment::Local;
    let folder_key = derive_root_folder_key(&root, env).unwrap();
    let folder_keypair = derive_root_folder_keypair(&root, env).unwrap();

    let owner_sk_bytes = cipherbox_core::crypto::utils::generate_random_bytes(32);
    let owner_sk = ecies::SecretKey::parse_slice(&owner_sk_bytes).unwrap();
    let owner_pub = ecies::PublicKey::from_secret_key(&owner_sk).serialize().to_vec();

    let recipient_sk_bytes = cipherbox_core::crypto::utils::generate_random_bytes(32);
    let recipient_sk = ecies::SecretKey::parse_slice(&recipient_sk_bytes).unwrap();
    let recipient_pub = ecies::PublicKey::from_secret_key(&recipient_sk)
        .serialize()
        .to_vec();

    let wrapped_for_owner = cipherbox_core::crypto::ecies::wrap_key(&folder_key, &owner_pub).unwrap();

    let share = create_share(
        "share-1".to_string(),
        &owner_pub,
        &recipient_pub,
        ItemType::Folder,
        folder_keypair.name.clone(),
        "My Vault".to_string(),
        &wrapped_for_owner,
        &owner_sk_bytes,
        1000,
        &[],
    )
    .unwrap();

    let recovered_folder_key =
        cipherbox_core::crypto::ecies::unwrap_key(&share.encrypted_key, &recipient_sk.serialize())
            .unwrap();
    assert_eq!(recovered_folder_key.as_slice(), folder_key.as_slice());

    let metadata = FolderMetadata::new();
    let envelope = encrypt_folder_metadata(&metadata, &folder_key).unwrap();
    let mut key = [0u8; 32];
    key.copy_from_slice(&recovered_folder_key);
    let recovered_metadata = decrypt_folder_metadata(&envelope, &key).unwrap();
    assert!(recovered_metadata.children.is_empty());
}

#[tokio::test]
async fn tampered_record_is_rejected_by_verification_not_the_relay() {
    let root = root_secret();
    let env = Environment::Local;
    let keypair = derive_root_folder_keypair(&root, env).unwrap();

    let relay = Arc::new(FakeNameRelay::new());
    let coordinator = PublishCoordinator::new(relay.clone());
    coordinator
        .publish_one(&keypair.name, &keypair.signing_key, "bafygenuine")
        .await
        .unwrap();

    let resolved = relay.resolve(&keypair.name).await.unwrap();
    let mut tampered_bytes = resolved.record_bytes.clone();
    let last = tampered_bytes.len() - 1;
    tampered_bytes[last] ^= 0xff;

    // The fake relay has no signature-checking of its own (that's not its
    // job); a real relay would store this exact bytes blob too. Rejection
    // has to happen at the verifying reader.
    if let Ok(parsed) = parse_record(&tampered_bytes) {
        assert_ne!(verify_record(&parsed), Verification::Verified);
    }
}

#[tokio::test]
async fn two_devices_deriving_the_same_folder_id_agree_on_its_name() {
    let root = root_secret();
    let env = Environment::Local;

    let device_a = derive_folder_keypair(&root, env, "folder-0000000001").unwrap();
    let device_b = derive_folder_keypair(&root, env, "folder-0000000001").unwrap();
    assert_eq!(device_a.name.as_str(), device_b.name.as_str());

    // And that Name is exactly what you'd get from deriving the Name
    // straight from the public key, independent of the keypair derivation
    // path.
    let expected = derive_name(&device_a.signing_key.verifying_key().to_bytes()).unwrap();
    assert_eq!(device_a.name.as_str(), expected.as_str());
}

#[tokio::test]
async fn folder_pointer_round_trips_through_parent_metadata() {
    let root = root_secret();
    let env = Environment::Local;
    let parent_key = derive_root_folder_key(&root, env).unwrap();

    let child_keypair = derive_folder_keypair(&root, env, "folder-0000000099").unwrap();
    let child_folder_key = cipherbox_core::keys::generate_file_symmetric_key();

    let owner_sk_bytes = cipherbox_core::crypto::utils::generate_random_bytes(32);
    let owner_sk = ecies::SecretKey::parse_slice(&owner_sk_bytes).unwrap();
    let owner_pub = ecies::PublicKey::from_secret_key(&owner_sk).serialize().to_vec();

    let wrapped_priv_key = cipherbox_core::crypto::ecies::wrap_key(
        child_keypair.signing_key.to_bytes().as_slice(),
        &owner_pub,
    )
    .unwrap();
    let wrapped_folder_key =
        cipherbox_core::crypto::ecies::wrap_key(&child_folder_key, &owner_pub).unwrap();

    let parent_metadata = FolderMetadata {
        version: "v2".to_string(),
        children: vec![FolderChild::Folder(FolderPointer {
            id: "folder-0000000099".to_string(),
            name: "Photos".to_string(),
            child_name: child_keypair.name.as_str().to_string(),
            enc_wrapped_priv_key: hex::encode(&wrapped_priv_key),
            enc_wrapped_folder_key: hex::encode(&wrapped_folder_key),
            created_at: 1,
            modified_at: 1,
        })],
    };

    let envelope = encrypt_folder_metadata(&parent_metadata, &parent_key).unwrap();
    let recovered = decrypt_folder_metadata(&envelope, &parent_key).unwrap();

    let FolderChild::Folder(ptr) = &recovered.children[0] else {
        panic!("expected a folder pointer");
    };
    assert_eq!(ptr.child_name, child_keypair.name.as_str());

    let unwrapped_folder_key = cipherbox_core::crypto::ecies::unwrap_key(
        &hex::decode(&ptr.enc_wrapped_folder_key).unwrap(),
        &owner_sk.serialize(),
    )
    .unwrap();
    assert_eq!(unwrapped_folder_key.as_slice(), &child_folder_key);
}

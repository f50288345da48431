//! Share engine: per-recipient key rewrap, descendant key collection, and
//! lazy rotation on revocation.
//!
//! The teacher has no sharing code at all; this module is grounded on its
//! ECIES wrap/unwrap primitives (`crypto::ecies`) and its zero-on-drop
//! discipline (`state::AppState::clear_keys`), generalized into the
//! rewrap/rotate protocol spec'd here. Subtree traversal walks an in-memory
//! [`FolderTree`] the caller assembles from already-fetched, already-
//! decrypted metadata -- fetching that metadata over the network is the
//! object store / name relay's job (external collaborators), not this
//! module's.

use std::collections::HashSet;

use thiserror::Error;
use zeroize::Zeroize;

use crate::crypto::ecies::{unwrap_key, wrap_key};
use crate::crypto::utils::generate_file_key;
use crate::error::CoreError;
use crate::ipns::Name;

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("self-share is not allowed")]
    SelfShare,
    #[error("duplicate active share")]
    DuplicateShare,
    #[error("rewrap failed")]
    RewrapFailed,
}

impl From<ShareError> for CoreError {
    fn from(e: ShareError) -> Self {
        match e {
            ShareError::SelfShare | ShareError::DuplicateShare => {
                CoreError::RevokedOrNotAMember
            }
            ShareError::RewrapFailed => CoreError::DecryptionFailed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    Folder,
    File,
}

/// A single outbound share of a folder or file to one recipient.
#[derive(Debug, Clone)]
pub struct Share {
    pub share_id: String,
    pub sharer_pub: Vec<u8>,
    pub recipient_pub: Vec<u8>,
    pub item_type: ItemType,
    pub ipns_name: Name,
    /// Plaintext display name; see spec open question (a) -- deliberately
    /// not encrypted in this version.
    pub item_name: String,
    /// Hex ECIES wrapping of the shared item's symmetric/signing key under
    /// `recipient_pub`.
    pub encrypted_key: Vec<u8>,
    pub created_at: u64,
    pub revoked_at: Option<u64>,
}

/// A rewrapped key for one descendant of a shared folder, handed to the
/// recipient alongside the top-level [`Share`].
#[derive(Debug, Clone)]
pub struct ShareKey {
    pub share_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    pub encrypted_key: Vec<u8>,
}

/// Unwrap `wrapped` under `owner_priv`, re-wrap the recovered plaintext
/// under `recipient_pub`, and zero the plaintext before returning. This is
/// the one operation every share/rotation path bottoms out on.
pub fn rewrap(
    wrapped: &[u8],
    owner_priv: &[u8],
    recipient_pub: &[u8],
) -> Result<Vec<u8>, ShareError> {
    let mut plain = unwrap_key(wrapped, owner_priv).map_err(|_| ShareError::RewrapFailed)?;
    let result = wrap_key(&plain, recipient_pub).map_err(|_| ShareError::RewrapFailed);
    plain.zeroize();
    result
}

/// An in-memory view of one node in a folder's subtree, assembled by the
/// caller from already-fetched, already-decrypted metadata. Keys here are
/// still in their owner-ECIES-wrapped form; `share_subtree` rewraps them
/// for the recipient without the plaintext ever touching caller code.
pub enum FolderTreeNode {
    Folder {
        id: String,
        wrapped_priv_key: Vec<u8>,
        wrapped_folder_key: Vec<u8>,
        children: Vec<FolderTreeNode>,
    },
    File {
        id: String,
        wrapped_file_key: Vec<u8>,
    },
}

/// Create the top-level [`Share`] record for `item`, enforcing the
/// access-control invariants (no self-share, no duplicate active share).
/// `existing` is the sharer's current sent-shares set for this Name.
pub fn create_share(
    share_id: String,
    sharer_pub: &[u8],
    recipient_pub: &[u8],
    item_type: ItemType,
    ipns_name: Name,
    item_name: String,
    wrapped_key_for_owner: &[u8],
    owner_priv: &[u8],
    created_at: u64,
    existing: &[Share],
) -> Result<Share, ShareError> {
    if sharer_pub == recipient_pub {
        return Err(ShareError::SelfShare);
    }
    if existing.iter().any(|s| {
        s.revoked_at.is_none()
            && s.recipient_pub == recipient_pub
            && s.ipns_name.as_str() == ipns_name.as_str()
    }) {
        return Err(ShareError::DuplicateShare);
    }

    let encrypted_key = rewrap(wrapped_key_for_owner, owner_priv, recipient_pub)?;

    Ok(Share {
        share_id,
        sharer_pub: sharer_pub.to_vec(),
        recipient_pub: recipient_pub.to_vec(),
        item_type,
        ipns_name,
        item_name,
        encrypted_key,
        created_at,
        revoked_at: None,
    })
}

/// Depth-first rewrap of every descendant key in `tree` for `recipient_pub`,
/// owner-unwrapping each with `owner_priv` before re-wrapping. Plaintext
/// buffers are zeroed by [`rewrap`] immediately after each re-wrap.
pub fn share_subtree(
    share_id: &str,
    tree: &FolderTreeNode,
    owner_priv: &[u8],
    recipient_pub: &[u8],
) -> Result<Vec<ShareKey>, ShareError> {
    let mut out = Vec::new();
    walk(share_id, tree, owner_priv, recipient_pub, &mut out)?;
    Ok(out)
}

fn walk(
    share_id: &str,
    node: &FolderTreeNode,
    owner_priv: &[u8],
    recipient_pub: &[u8],
    out: &mut Vec<ShareKey>,
) -> Result<(), ShareError> {
    match node {
        FolderTreeNode::Folder {
            id,
            wrapped_priv_key,
            wrapped_folder_key,
            children,
        } => {
            out.push(ShareKey {
                share_id: share_id.to_string(),
                item_type: ItemType::Folder,
                item_id: id.clone(),
                encrypted_key: rewrap(wrapped_priv_key, owner_priv, recipient_pub)?,
            });
            out.push(ShareKey {
                share_id: share_id.to_string(),
                item_type: ItemType::Folder,
                item_id: id.clone(),
                encrypted_key: rewrap(wrapped_folder_key, owner_priv, recipient_pub)?,
            });
            for child in children {
                walk(share_id, child, owner_priv, recipient_pub, out)?;
            }
        }
        FolderTreeNode::File { id, wrapped_file_key } => {
            out.push(ShareKey {
                share_id: share_id.to_string(),
                item_type: ItemType::File,
                item_id: id.clone(),
                encrypted_key: rewrap(wrapped_file_key, owner_priv, recipient_pub)?,
            });
        }
    }
    Ok(())
}

/// Result of rotating a folder's symmetric key after a revocation.
pub struct RotationResult {
    pub new_folder_key: [u8; 32],
    /// `(share_id, new_encrypted_key)` for every remaining active recipient.
    pub rewrapped_shares: Vec<(String, Vec<u8>)>,
}

/// True if `shares` (the sent-shares set for one Name) has any revoked-but-
/// not-yet-hard-deleted entry, meaning the next mutation of that folder
/// must rotate its key before proceeding.
pub fn has_pending_rotation(shares: &[Share]) -> bool {
    shares.iter().any(|s| s.revoked_at.is_some())
}

/// Generate a fresh folder key and re-wrap it for every remaining
/// (non-revoked) recipient in `shares`. Callers are responsible for
/// decrypting the folder's current metadata with the old key, re-encrypting
/// under `new_folder_key`, publishing the new record, updating each
/// listed share's `encryptedKey`, and only then hard-deleting the revoked
/// rows -- this function computes the crypto, it does not perform the
/// storage side-effects.
pub fn rotate_folder_key(
    owner_pub: &[u8],
    shares: &[Share],
) -> Result<RotationResult, ShareError> {
    let new_folder_key = generate_file_key();

    let mut rewrapped_shares = Vec::new();
    for share in shares.iter().filter(|s| s.revoked_at.is_none()) {
        let wrapped =
            wrap_key(&new_folder_key, &share.recipient_pub).map_err(|_| ShareError::RewrapFailed)?;
        rewrapped_shares.push((share.share_id.clone(), wrapped));
    }
    let _ = owner_pub; // kept for symmetry with the wrap/rewrap call sites; no self-entry needed

    Ok(RotationResult {
        new_folder_key,
        rewrapped_shares,
    })
}

/// Find every Name between `folder` (inclusive) and the root that appears
/// in `sent_shares`, used to decide which ancestor shares must receive a
/// freshly created descendant's key before an operation returns success.
pub fn covering_ancestor_shares<'a>(
    ancestors: &[Name],
    sent_shares: &'a [Share],
) -> Vec<&'a Share> {
    let ancestor_set: HashSet<&str> = ancestors.iter().map(|n| n.as_str()).collect();
    sent_shares
        .iter()
        .filter(|s| s.revoked_at.is_none() && ancestor_set.contains(s.ipns_name.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::ecies::wrap_key;
    use crate::ipns::derive_name;

    fn keypair() -> (ecies::SecretKey, Vec<u8>) {
        let sk_bytes = crate::crypto::utils::generate_random_bytes(32);
        let sk = ecies::SecretKey::parse_slice(&sk_bytes).unwrap();
        let pk = ecies::PublicKey::from_secret_key(&sk);
        (sk, pk.serialize().to_vec())
    }

    fn test_name() -> Name {
        derive_name(&[1u8; 32]).unwrap()
    }

    #[test]
    fn self_share_is_rejected() {
        let (owner_sk, owner_pub) = keypair();
        let owner_priv = owner_sk.serialize().to_vec();
        let wrapped = wrap_key(&[0u8; 32], &owner_pub).unwrap();

        let result = create_share(
            "share-1".to_string(),
            &owner_pub,
            &owner_pub,
            ItemType::Folder,
            test_name(),
            "My Folder".to_string(),
            &wrapped,
            &owner_priv,
            1,
            &[],
        );
        assert!(matches!(result, Err(ShareError::SelfShare)));
    }

    #[test]
    fn duplicate_active_share_is_rejected() {
        let (owner_sk, owner_pub) = keypair();
        let owner_priv = owner_sk.serialize().to_vec();
        let (_recipient_sk, recipient_pub) = keypair();
        let wrapped = wrap_key(&[0u8; 32], &owner_pub).unwrap();
        let name = test_name();

        let first = create_share(
            "share-1".to_string(),
            &owner_pub,
            &recipient_pub,
            ItemType::Folder,
            name.clone(),
            "My Folder".to_string(),
            &wrapped,
            &owner_priv,
            1,
            &[],
        )
        .unwrap();

        let second = create_share(
            "share-2".to_string(),
            &owner_pub,
            &recipient_pub,
            ItemType::Folder,
            name,
            "My Folder".to_string(),
            &wrapped,
            &owner_priv,
            2,
            &[first],
        );
        assert!(matches!(second, Err(ShareError::DuplicateShare)));
    }

    #[test]
    fn rewrap_round_trips_through_recipient_key() {
        let (owner_sk, owner_pub) = keypair();
        let owner_priv = owner_sk.serialize().to_vec();
        let (recipient_sk, recipient_pub) = keypair();
        let recipient_priv = recipient_sk.serialize().to_vec();

        let plain_key = [7u8; 32];
        let wrapped_for_owner = wrap_key(&plain_key, &owner_pub).unwrap();
        let wrapped_for_recipient =
            rewrap(&wrapped_for_owner, &owner_priv, &recipient_pub).unwrap();

        let recovered = unwrap_key(&wrapped_for_recipient, &recipient_priv).unwrap();
        assert_eq!(recovered, plain_key);
    }

    #[test]
    fn share_subtree_rewraps_every_descendant() {
        let (owner_sk, owner_pub) = keypair();
        let owner_priv = owner_sk.serialize().to_vec();
        let (_recipient_sk, recipient_pub) = keypair();

        let tree = FolderTreeNode::Folder {
            id: "root".to_string(),
            wrapped_priv_key: wrap_key(&[1u8; 32], &owner_pub).unwrap(),
            wrapped_folder_key: wrap_key(&[2u8; 32], &owner_pub).unwrap(),
            children: vec![
                FolderTreeNode::File {
                    id: "file-1".to_string(),
                    wrapped_file_key: wrap_key(&[3u8; 32], &owner_pub).unwrap(),
                },
                FolderTreeNode::Folder {
                    id: "sub".to_string(),
                    wrapped_priv_key: wrap_key(&[4u8; 32], &owner_pub).unwrap(),
                    wrapped_folder_key: wrap_key(&[5u8; 32], &owner_pub).unwrap(),
                    children: vec![],
                },
            ],
        };

        let keys = share_subtree("share-1", &tree, &owner_priv, &recipient_pub).unwrap();
        // root: priv + folder key, file-1: file key, sub: priv + folder key = 5
        assert_eq!(keys.len(), 5);
    }

    #[test]
    fn pending_rotation_detected_after_revoke() {
        let (owner_sk, owner_pub) = keypair();
        let owner_priv = owner_sk.serialize().to_vec();
        let (_recipient_sk, recipient_pub) = keypair();
        let wrapped = wrap_key(&[0u8; 32], &owner_pub).unwrap();

        let mut share = create_share(
            "share-1".to_string(),
            &owner_pub,
            &recipient_pub,
            ItemType::Folder,
            test_name(),
            "My Folder".to_string(),
            &wrapped,
            &owner_priv,
            1,
            &[],
        )
        .unwrap();

        assert!(!has_pending_rotation(std::slice::from_ref(&share)));
        share.revoked_at = Some(2);
        assert!(has_pending_rotation(std::slice::from_ref(&share)));
    }

    #[test]
    fn rotation_rewraps_only_remaining_recipients() {
        let (owner_sk, owner_pub) = keypair();
        let owner_priv = owner_sk.serialize().to_vec();
        let (_, recipient_a_pub) = keypair();
        let (recipient_b_sk, recipient_b_pub) = keypair();
        let wrapped = wrap_key(&[0u8; 32], &owner_pub).unwrap();

        let mut share_a = create_share(
            "share-a".to_string(),
            &owner_pub,
            &recipient_a_pub,
            ItemType::Folder,
            test_name(),
            "F".to_string(),
            &wrapped,
            &owner_priv,
            1,
            &[],
        )
        .unwrap();
        share_a.revoked_at = Some(5);

        let share_b = create_share(
            "share-b".to_string(),
            &owner_pub,
            &recipient_b_pub,
            ItemType::Folder,
            test_name(),
            "F".to_string(),
            &wrapped,
            &owner_priv,
            1,
            &[],
        )
        .unwrap();

        let shares = vec![share_a, share_b];
        let rotation = rotate_folder_key(&owner_pub, &shares).unwrap();
        assert_eq!(rotation.rewrapped_shares.len(), 1);
        assert_eq!(rotation.rewrapped_shares[0].0, "share-b");

        let recipient_b_priv = recipient_b_sk.serialize().to_vec();
        let recovered =
            unwrap_key(&rotation.rewrapped_shares[0].1, &recipient_b_priv).unwrap();
        assert_eq!(recovered, rotation.new_folder_key);
    }
}

use crate::error::{BlockchainError, Result};
use crate::utils::sha256_hex;
use serde::{Deserialize, Serialize};

/// Merkle commitment over an ordered list of transaction ids.
///
/// Nodes are lowercase hex digests and a parent is the SHA-256 of the two
/// child *strings* concatenated. Whenever a level (the leaves included) has
/// an odd number of entries and more than one, its last entry is duplicated.
/// The empty list commits to SHA-256 of the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleTree {
    /// levels[0] are the padded leaves, the last level holds the root
    levels: Vec<Vec<String>>,
    leaf_count: usize,
}

/// Inclusion proof for one transaction id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    pub transaction_id: String,
    pub merkle_root: String,
    pub proof_path: Vec<ProofElement>,
    pub transaction_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofElement {
    pub hash: String,
    /// true if the sibling sits on the right
    pub is_right: bool,
}

/// Root of the commitment for `ids`.
pub fn merkle_root<S: AsRef<str>>(ids: &[S]) -> String {
    MerkleTree::from_ids(ids).root()
}

impl MerkleTree {
    pub fn from_ids<S: AsRef<str>>(ids: &[S]) -> MerkleTree {
        let mut leaves: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
        if leaves.is_empty() {
            return MerkleTree {
                levels: Vec::new(),
                leaf_count: 0,
            };
        }
        if leaves.len() % 2 != 0 {
            let last = leaves[leaves.len() - 1].clone();
            leaves.push(last);
        }

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            let mut next: Vec<String> = current
                .chunks(2)
                .map(|pair| Self::hash_pair(&pair[0], &pair[1]))
                .collect();
            if next.len() % 2 != 0 && next.len() > 1 {
                let last = next[next.len() - 1].clone();
                next.push(last);
            }
            levels.push(next);
        }

        MerkleTree {
            levels,
            leaf_count: ids.len(),
        }
    }

    pub fn root(&self) -> String {
        match self.levels.last().and_then(|level| level.first()) {
            Some(root) => root.clone(),
            None => sha256_hex(b""),
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn is_empty(&self) -> bool {
        self.leaf_count == 0
    }

    /// Sibling path from the leaf at `transaction_index` up to the root.
    pub fn proof(&self, transaction_index: usize) -> Result<MerkleProof> {
        if transaction_index >= self.leaf_count {
            return Err(BlockchainError::InvalidBlock(format!(
                "Transaction index {transaction_index} out of bounds ({} leaves)",
                self.leaf_count
            )));
        }

        let mut proof_path = Vec::with_capacity(self.levels.len());
        let mut index = transaction_index;
        for level in &self.levels[..self.levels.len() - 1] {
            let sibling = index ^ 1;
            proof_path.push(ProofElement {
                hash: level[sibling].clone(),
                is_right: index % 2 == 0,
            });
            index /= 2;
        }

        Ok(MerkleProof {
            transaction_id: self.levels[0][transaction_index].clone(),
            merkle_root: self.root(),
            proof_path,
            transaction_index,
        })
    }

    pub fn verify_proof(proof: &MerkleProof) -> bool {
        let computed = proof
            .proof_path
            .iter()
            .fold(proof.transaction_id.clone(), |current, element| {
                if element.is_right {
                    Self::hash_pair(&current, &element.hash)
                } else {
                    Self::hash_pair(&element.hash, &current)
                }
            });
        computed == proof.merkle_root
    }

    fn hash_pair(left: &str, right: &str) -> String {
        let mut combined = String::with_capacity(left.len() + right.len());
        combined.push_str(left);
        combined.push_str(right);
        sha256_hex(combined.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| sha256_hex(format!("tx{i}").as_bytes())).collect()
    }

    fn h(data: &str) -> String {
        sha256_hex(data.as_bytes())
    }

    #[test]
    fn test_empty_list_commits_to_hash_of_empty_string() {
        let empty: Vec<String> = vec![];
        assert_eq!(merkle_root(&empty), h(""));
        assert!(MerkleTree::from_ids(&empty).is_empty());
    }

    #[test]
    fn test_single_id_is_paired_with_itself() {
        let t = ids(1);
        assert_eq!(merkle_root(&t), h(&format!("{}{}", t[0], t[0])));
    }

    #[test]
    fn test_two_ids() {
        let t = ids(2);
        assert_eq!(merkle_root(&t), h(&format!("{}{}", t[0], t[1])));
    }

    #[test]
    fn test_three_ids_duplicate_last_leaf() {
        let t = ids(3);
        let left = h(&format!("{}{}", t[0], t[1]));
        let right = h(&format!("{}{}", t[2], t[2]));
        assert_eq!(merkle_root(&t), h(&format!("{left}{right}")));
    }

    #[test]
    fn test_six_ids_pad_inner_level() {
        // 6 leaves -> 3 parents -> padded to 4 -> 2 -> 1
        let t = ids(6);
        let p0 = h(&format!("{}{}", t[0], t[1]));
        let p1 = h(&format!("{}{}", t[2], t[3]));
        let p2 = h(&format!("{}{}", t[4], t[5]));
        let q0 = h(&format!("{p0}{p1}"));
        let q1 = h(&format!("{p2}{p2}"));
        assert_eq!(merkle_root(&t), h(&format!("{q0}{q1}")));
    }

    #[test]
    fn test_order_matters() {
        let t = ids(2);
        let reversed = vec![t[1].clone(), t[0].clone()];
        assert_ne!(merkle_root(&t), merkle_root(&reversed));
    }

    #[test]
    fn test_proofs_verify_for_every_leaf() {
        for n in [1, 2, 3, 5, 6, 11] {
            let t = ids(n);
            let tree = MerkleTree::from_ids(&t);
            for (i, id) in t.iter().enumerate() {
                let proof = tree.proof(i).unwrap();
                assert_eq!(&proof.transaction_id, id);
                assert_eq!(proof.merkle_root, merkle_root(&t));
                assert!(MerkleTree::verify_proof(&proof), "leaf {i} of {n}");
            }
        }
    }

    #[test]
    fn test_forged_proof_fails() {
        let t = ids(4);
        let tree = MerkleTree::from_ids(&t);
        let mut proof = tree.proof(2).unwrap();
        proof.transaction_id = h("forged");
        assert!(!MerkleTree::verify_proof(&proof));
    }

    #[test]
    fn test_proof_index_out_of_bounds() {
        let tree = MerkleTree::from_ids(&ids(3));
        assert!(tree.proof(3).is_err());
    }
}

use application::{PasswordHasher, PasswordHasherError};
use async_trait::async_trait;
use domain::PasswordHash;

pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// bcrypt 密码哈希。计算放到阻塞线程池，避免拖住异步调度器。
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHasherError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();

        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|err| PasswordHasherError::Hash(err.to_string()))?
            .map_err(|err| PasswordHasherError::Hash(err.to_string()))?;

        PasswordHash::new(hashed).map_err(|err| PasswordHasherError::Hash(err.to_string()))
    }

    async fn verify(
        &self,
        plaintext: &str,
        hash: &PasswordHash,
    ) -> Result<bool, PasswordHasherError> {
        let plaintext = plaintext.to_owned();
        let hash = hash.as_str().to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &hash))
            .await
            .map_err(|err| PasswordHasherError::Verify(err.to_string()))?
            .map_err(|err| PasswordHasherError::Verify(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify_roundtrip() {
        // 低成本参数，只为测试速度
        let hasher = BcryptPasswordHasher::new(4);
        let hash = hasher.hash("secret").await.unwrap();

        assert!(hasher.verify("secret", &hash).await.unwrap());
        assert!(!hasher.verify("wrong", &hash).await.unwrap());
    }
}

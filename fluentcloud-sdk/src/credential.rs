use crate::error::Result;
use async_trait::async_trait;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
}

/// Source of bearer tokens for the pipeline.
///
/// Real token acquisition is out of scope; implementors only have to hand back
/// something the endpoint accepts.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    async fn get_token(&self) -> Result<AccessToken>;
}

/// Always returns the same token.
#[derive(Clone, Debug)]
pub struct StaticTokenCredential {
    token: String,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(&self) -> Result<AccessToken> {
        Ok(AccessToken {
            token: self.token.clone(),
        })
    }
}

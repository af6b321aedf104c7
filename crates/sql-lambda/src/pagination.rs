//! `nextToken` values are opaque to clients: a base64 encoded JSON offset.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::{request::LambdaRequest, SqlLambdaError};

pub const DEFAULT_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Cursor {
    offset: u64,
}

pub fn encode_next_token(offset: u64) -> String {
    let json = serde_json::to_vec(&Cursor { offset }).unwrap_or_default();
    STANDARD.encode(json)
}

pub fn decode_next_token(token: &str) -> Result<u64, SqlLambdaError> {
    let bytes = STANDARD.decode(token).map_err(|_| SqlLambdaError::InvalidNextToken)?;
    let cursor: Cursor = serde_json::from_slice(&bytes).map_err(|_| SqlLambdaError::InvalidNextToken)?;
    Ok(cursor.offset)
}

/// The token of the page after one that started at `offset` and returned `returned` of `limit`
/// rows. A short page is the last one, and a page of no rows never has a successor.
pub fn next_page_token(offset: u64, limit: u64, returned: u64) -> Option<String> {
    (limit > 0 && returned >= limit).then(|| encode_next_token(offset + returned))
}

/// The window of rows a list request reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

impl Page {
    pub fn first() -> Self {
        Page { offset: 0, limit: 1 }
    }

    /// The page `limit` and `nextToken` of the request address.
    pub fn of(request: &LambdaRequest) -> Result<Self, SqlLambdaError> {
        let offset = request.next_token().map(decode_next_token).transpose()?.unwrap_or(0);
        let limit = request.limit().unwrap_or(DEFAULT_LIMIT);
        Ok(Page { offset, limit })
    }

    pub fn next_token(&self, returned: usize) -> Option<String> {
        next_page_token(self.offset, self.limit, u64::try_from(returned).unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_carry_the_offset() {
        let token = encode_next_token(200);
        assert_eq!(token, "eyJvZmZzZXQiOjIwMH0=");
        assert_eq!(decode_next_token(&token), Ok(200));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(decode_next_token("not base64!"), Err(SqlLambdaError::InvalidNextToken));
        assert_eq!(decode_next_token("bm90IGpzb24="), Err(SqlLambdaError::InvalidNextToken));
    }

    #[test]
    fn short_pages_end_the_listing() {
        assert_eq!(next_page_token(0, 10, 4), None);
        assert_eq!(next_page_token(0, 10, 10).as_deref(), Some("eyJvZmZzZXQiOjEwfQ=="));
    }

    #[test]
    fn zero_limits_end_the_listing() {
        assert_eq!(next_page_token(0, 0, 0), None);
        assert_eq!(next_page_token(40, 0, 0), None);
    }
}

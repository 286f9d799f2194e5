//! Entry identifiers.
//!
//! # ULID ベースの ID
//! キューのエントリは ULID で識別します。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、enqueue 順とほぼ一致する
//! - **分散生成可能**: 端末ごとに調整なしで生成できる
//! - **永続化に強い**: 文字列表現がそのまま JSON に保存できる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ulid::Ulid;

/// Display で使うプレフィックス
const PREFIX: &str = "entry-";

/// Identifier of a queued entry, stable for the entry's whole lifetime.
///
/// 永続化形式では prefix なしの ULID 文字列として保存されます。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Ulid);

impl EntryId {
    /// ULID から EntryId を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for EntryId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.0)
    }
}

impl FromStr for EntryId {
    type Err = ulid::DecodeError;

    /// `entry-<ulid>` と素の `<ulid>` の両方を受け付ける
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(PREFIX).unwrap_or(s);
        Ulid::from_string(raw).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_entry_prefix() {
        let ulid = Ulid::new();
        let id = EntryId::from_ulid(ulid);

        assert_eq!(id.as_ulid(), ulid);
        assert_eq!(id.to_string(), format!("entry-{ulid}"));
    }

    #[test]
    fn parses_prefixed_and_bare_forms() {
        let id = EntryId::from_ulid(Ulid::new());

        let prefixed: EntryId = id.to_string().parse().unwrap();
        let bare: EntryId = id.as_ulid().to_string().parse().unwrap();

        assert_eq!(prefixed, id);
        assert_eq!(bare, id);
        assert!("entry-not-a-ulid".parse::<EntryId>().is_err());
    }

    #[test]
    fn serializes_as_bare_ulid_string() {
        let ulid = Ulid::new();
        let id = EntryId::from(ulid);

        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{ulid}\""));

        let back: EntryId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let id1 = EntryId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = EntryId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }
}

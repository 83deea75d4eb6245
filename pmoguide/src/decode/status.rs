use serde_json::Value;
use tracing::warn;

use crate::error::DecodeError;
use crate::model::{Account, LineupStamp, Message, SystemStatus, UserStatus};
use crate::raw::Record;

const USER_STATUS: &str = "UserStatus";
const MESSAGE: &str = "Message";

pub(crate) fn decode_message(raw: &Value) -> Result<Message, DecodeError> {
    let record = Record::new(MESSAGE, raw)?;
    Ok(Message {
        id: record.req_id("msgID")?,
        date: record.req_timestamp("date")?,
        content: record.opt_string("message").unwrap_or_default(),
    })
}

/// Decodes the account status document
///
/// Messages, lineup stamps and system status entries that do not decode are
/// skipped with a warning.
pub(crate) fn decode_user_status(raw: &Value) -> Result<UserStatus, DecodeError> {
    let record = Record::new(USER_STATUS, raw)?;
    let account = record.req_object("account")?;

    let account = Account {
        expires: account.req_timestamp("expires")?,
        next_suggested_connect_time: account.opt_timestamp("nextSuggestedConnectTime"),
        max_lineups: account.opt_u32("maxLineups").unwrap_or(0),
        messages: decode_messages(account.opt_array("messages")),
    };

    let lineups = record
        .objects("lineups")
        .into_iter()
        .filter_map(|stamp| {
            let id = stamp
                .opt_string("ID")
                .or_else(|| stamp.opt_string("lineup"))?;
            let modified = stamp.opt_timestamp("modified")?;
            Some(LineupStamp { id, modified })
        })
        .collect();

    Ok(UserStatus {
        account,
        last_data_update: record.req_timestamp("lastDataUpdate")?,
        notifications: decode_messages(record.opt_array("notifications")),
        lineups,
        system_status: decode_system_status(raw),
    })
}

/// Latest entry (by date) of the `systemStatus` list of a status document
pub(crate) fn decode_system_status(raw: &Value) -> Option<SystemStatus> {
    let record = Record::new(USER_STATUS, raw).ok()?;
    record
        .objects("systemStatus")
        .into_iter()
        .filter_map(|entry| {
            Some(SystemStatus {
                date: entry.opt_timestamp("date")?,
                status: entry.opt_string("status")?,
                details: entry.opt_string("details").unwrap_or_default(),
            })
        })
        .max_by_key(|status| status.date)
}

fn decode_messages(items: &[Value]) -> Vec<Message> {
    items
        .iter()
        .filter_map(|item| match decode_message(item) {
            Ok(message) => Some(message),
            Err(err) => {
                warn!("Skipping message: {}", err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn status_document() -> Value {
        json!({
            "account": {
                "expires": "2015-06-28T05:16:29Z",
                "messages": [
                    {"msgID": "1", "date": "2014-06-01T00:00:00Z", "message": "Renew soon"},
                    {"msgID": "2"},
                ],
                "maxLineups": 4,
                "nextSuggestedConnectTime": "2014-07-01T12:00:00Z",
            },
            "lineups": [{"ID": "USA-OTA-48104", "modified": "2014-06-20T18:24:14Z"}],
            "lastDataUpdate": "2014-06-28T05:16:29Z",
            "notifications": [],
            "systemStatus": [
                {"date": "2014-06-20T00:00:00Z", "status": "Offline", "details": "Maintenance"},
                {"date": "2014-06-27T00:00:00Z", "status": "Online", "details": "No known issues."},
            ],
        })
    }

    #[test]
    fn test_decode_user_status() {
        let status = decode_user_status(&status_document()).unwrap();
        assert_eq!(status.account.max_lineups, 4);
        assert_eq!(status.account.messages.len(), 1);
        assert_eq!(status.lineups[0].id, "USA-OTA-48104");
        assert!(status.system_status.as_ref().unwrap().is_online());

        let before = Utc.with_ymd_and_hms(2014, 6, 1, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2016, 1, 1, 0, 0, 0).unwrap();
        assert!(status.is_new_data_available(before));
        assert!(!status.is_expired(before));
        assert!(status.is_expired(after));
    }

    #[test]
    fn test_user_status_requires_account() {
        let raw = json!({"lastDataUpdate": "2014-06-28T05:16:29Z"});
        assert_eq!(
            decode_user_status(&raw).unwrap_err(),
            DecodeError::missing("UserStatus", "account")
        );
    }

    #[test]
    fn test_system_status_picks_latest() {
        let status = decode_system_status(&status_document()).unwrap();
        assert_eq!(status.status, "Online");
        assert!(decode_system_status(&json!({})).is_none());
    }

    #[test]
    fn test_decode_message() {
        let message = decode_message(&json!({"msgID": 42, "date": "2014-06-01T00:00:00Z"})).unwrap();
        assert_eq!(message.id, "42");
        assert_eq!(message.content, "");
    }
}

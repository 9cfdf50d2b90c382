use crate::library::communication::event::{BrokerError, Fields, Record, StreamBatch};
use redis::{from_redis_value, Value};

/// Converts the raw reply of an `XREADGROUP` command into batches while retaining field order
///
/// The reply has the shape `[[stream, [[id, [field, value, ...]], ...]], ...]` or is nil when
/// the block duration elapsed without any new entries.
pub(super) fn parse_read_reply(reply: Value) -> Result<Vec<StreamBatch>, BrokerError> {
    let streams = match reply {
        Value::Nil => return Err(BrokerError::Timeout),
        Value::Bulk(streams) => streams,
        other => return Err(malformed("stream list", &other)),
    };

    streams.into_iter().map(parse_stream).collect()
}

fn parse_stream(value: Value) -> Result<StreamBatch, BrokerError> {
    let (name, entries) = match value {
        Value::Bulk(mut parts) if parts.len() == 2 => {
            let entries = parts.pop();
            let name = parts.pop();
            (name, entries)
        }
        other => return Err(malformed("stream entry", &other)),
    };

    let stream = string(name.unwrap_or(Value::Nil))?;
    let records = match entries {
        Some(Value::Bulk(entries)) => entries
            .into_iter()
            .map(parse_record)
            .collect::<Result<Vec<_>, _>>()?,
        Some(other) => return Err(malformed("record list", &other)),
        None => Vec::new(),
    };

    Ok(StreamBatch { stream, records })
}

fn parse_record(value: Value) -> Result<Record, BrokerError> {
    let (id, fields) = match value {
        Value::Bulk(mut parts) if parts.len() == 2 => {
            let fields = parts.pop();
            let id = parts.pop();
            (id, fields)
        }
        other => return Err(malformed("record", &other)),
    };

    let id = string(id.unwrap_or(Value::Nil))?;
    let id = id
        .parse()
        .map_err(|e| BrokerError::MalformedReply(format!("{}", e)))?;

    let fields = match fields {
        // Entries deleted while pending are returned without fields
        Some(Value::Nil) | None => Fields::new(),
        Some(Value::Bulk(flat)) => parse_fields(flat)?,
        Some(other) => return Err(malformed("field list", &other)),
    };

    Ok(Record::new(id, fields))
}

fn parse_fields(flat: Vec<Value>) -> Result<Fields, BrokerError> {
    if flat.len() % 2 != 0 {
        return Err(BrokerError::MalformedReply(format!(
            "field list has an odd number of elements ({})",
            flat.len()
        )));
    }

    let mut fields = Fields::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();

    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        fields.push((string(key)?, string(value)?));
    }

    Ok(fields)
}

fn string(value: Value) -> Result<String, BrokerError> {
    from_redis_value(&value).map_err(|e| BrokerError::MalformedReply(e.to_string()))
}

fn malformed(expected: &str, actual: &Value) -> BrokerError {
    BrokerError::MalformedReply(format!("expected {}, got {:?}", expected, actual))
}

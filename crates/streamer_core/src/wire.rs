use crate::Event;

/// Frames an event as a server-sent event: an `event:` line, one `data:` line
/// per payload line, then a blank line.
pub fn encode(event: &Event) -> Result<String, serde_json::Error> {
    let payload = serde_json::to_string(event)?;
    Ok(encode_frame(event.name(), &payload))
}

pub fn encode_frame(name: &str, payload: &str) -> String {
    let mut frame = String::with_capacity(name.len() + payload.len() + 16);
    frame.push_str("event: ");
    frame.push_str(name);
    frame.push('\n');
    for line in payload.lines() {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

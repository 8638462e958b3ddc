/// Stream framer
///
/// Reassembles newline-delimited messages from arbitrary-sized chunks of
/// subprocess stdout. The trailing fragment after the last newline is kept
/// as the new buffer until more bytes arrive.
///
/// The buffer is byte-oriented so a chunk boundary inside a multi-byte
/// UTF-8 sequence cannot corrupt a line; decoding happens per complete line.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every newline-terminated line it completes.
    ///
    /// Lines are decoded lossily; empty lines are dropped. Parsing the line
    /// as protocol is the dispatcher's job, not the framer's.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop(); // trailing '\n'
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Number of buffered bytes awaiting a newline
    #[cfg(test)]
    pub(crate) fn pending_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_line() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"{\"id\":1}\n");
        assert_eq!(lines, vec!["{\"id\":1}".to_string()]);
        assert_eq!(framer.pending_len(), 0);
    }

    #[test]
    fn test_partial_line_is_retained() {
        let mut framer = LineFramer::new();
        assert!(framer.push(b"{\"id\":").is_empty());
        assert_eq!(framer.pending_len(), 6);
        let lines = framer.push(b"1}\n");
        assert_eq!(lines, vec!["{\"id\":1}".to_string()]);
    }

    #[test]
    fn test_multiple_lines_in_one_chunk() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"first\nsecond\nthird");
        assert_eq!(lines, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(framer.pending_len(), 5);
    }

    #[test]
    fn test_crlf_is_stripped() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"payload\r\n");
        assert_eq!(lines, vec!["payload".to_string()]);
    }

    #[test]
    fn test_empty_lines_are_dropped() {
        let mut framer = LineFramer::new();
        let lines = framer.push(b"\n\na\n\n");
        assert_eq!(lines, vec!["a".to_string()]);
    }

    #[test]
    fn test_multibyte_char_split_across_chunks() {
        let mut framer = LineFramer::new();
        let bytes = "héllo\n".as_bytes();
        assert!(framer.push(&bytes[..2]).is_empty()); // splits the é
        let lines = framer.push(&bytes[2..]);
        assert_eq!(lines, vec!["héllo".to_string()]);
    }
}

//! Server-Sent Events 行解码
//!
//! 网络分块可能在任意字节处切断（包括 UTF-8 多字节字符中间），按完整行输出 `data:` 载荷

/// 一帧 SSE 数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Data(String),
    /// `[DONE]` 结束标记
    Done,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一块字节，返回其中已完整的帧
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = parse_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// 流结束时处理没有换行结尾的最后一行
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&rest)
    }
}

fn parse_line(raw: &[u8]) -> Option<SseFrame> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    let data = line.strip_prefix("data:")?.trim();
    match data {
        "" => None,
        "[DONE]" => Some(SseFrame::Done),
        payload => Some(SseFrame::Data(payload.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"a\"").is_empty());
        let frames = decoder.push(b":1}\n\ndata: [DONE]\n");
        assert_eq!(
            frames,
            vec![SseFrame::Data("{\"a\":1}".into()), SseFrame::Done]
        );
    }

    #[test]
    fn test_multibyte_char_split() {
        let bytes = "data: 雨夜\n".as_bytes();
        let mut decoder = SseDecoder::new();
        // 切在“雨”字中间
        assert!(decoder.push(&bytes[..8]).is_empty());
        let frames = decoder.push(&bytes[8..]);
        assert_eq!(frames, vec![SseFrame::Data("雨夜".into())]);
    }

    #[test]
    fn test_ignores_comments_and_events() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\nevent: message\r\ndata:x\r\n");
        assert_eq!(frames, vec![SseFrame::Data("x".into())]);
        assert!(decoder.push(b"data: tail").is_empty());
        assert_eq!(decoder.finish(), Some(SseFrame::Data("tail".into())));
    }
}

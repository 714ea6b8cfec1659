//! 流式响应读取（各提供方共用）

use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::sse::{SseDecoder, SseFrame};
use crate::application::ports::GenerationError;

/// 从单帧 JSON 中取出增量文本
pub(super) type DeltaExtractor = fn(&Value) -> Option<String>;

pub(super) fn map_request_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else if e.is_connect() {
        GenerationError::Network(format!("Cannot connect to provider: {}", e))
    } else {
        GenerationError::Network(e.to_string())
    }
}

/// 非 2xx 响应转为 Provider 错误（尽量取出服务方返回的 message）
pub(super) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    Err(GenerationError::Provider {
        status: status.as_u16(),
        message,
    })
}

/// 读取 SSE 响应直到结束、`[DONE]` 或取消
///
/// 取消时返回已累积的部分文本
pub(super) async fn read_sse(
    response: reqwest::Response,
    chunks: &mpsc::Sender<String>,
    cancel: &CancellationToken,
    extract: DeltaExtractor,
) -> Result<String, GenerationError> {
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut full = String::new();

    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return Ok(full),
            item = stream.next() => item,
        };

        let frames = match item {
            Some(Ok(bytes)) => decoder.push(&bytes),
            Some(Err(e)) => return Err(map_request_error(e)),
            None => {
                let tail: Vec<SseFrame> = decoder.finish().into_iter().collect();
                apply_frames(tail, &mut full, chunks, extract).await?;
                return Ok(full);
            }
        };

        if apply_frames(frames, &mut full, chunks, extract).await? {
            return Ok(full);
        }
    }
}

/// 返回是否遇到结束标记
async fn apply_frames(
    frames: Vec<SseFrame>,
    full: &mut String,
    chunks: &mpsc::Sender<String>,
    extract: DeltaExtractor,
) -> Result<bool, GenerationError> {
    for frame in frames {
        let payload = match frame {
            SseFrame::Done => return Ok(true),
            SseFrame::Data(payload) => payload,
        };
        let value: Value = serde_json::from_str(&payload)
            .map_err(|e| GenerationError::MalformedStream(format!("{}; data={}", e, payload)))?;

        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            let status = error
                .get("code")
                .and_then(Value::as_u64)
                .and_then(|c| u16::try_from(c).ok())
                .unwrap_or(500);
            return Err(GenerationError::Provider { status, message });
        }

        if let Some(delta) = extract(&value).filter(|d| !d.is_empty()) {
            full.push_str(&delta);
            if chunks.send(delta).await.is_err() {
                // 消费端已关闭，继续累积全文
                tracing::debug!("Chunk receiver dropped");
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content(value: &Value) -> Option<String> {
        value.get("text").and_then(Value::as_str).map(str::to_string)
    }

    #[tokio::test]
    async fn test_frames_accumulate_until_done() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut full = String::new();
        let frames = vec![
            SseFrame::Data(r#"{"text":"第一"}"#.to_string()),
            SseFrame::Data(r#"{"text":""}"#.to_string()),
            SseFrame::Data(r#"{"text":"章"}"#.to_string()),
            SseFrame::Done,
            SseFrame::Data(r#"{"text":"多余"}"#.to_string()),
        ];

        let done = apply_frames(frames, &mut full, &tx, content).await.unwrap();
        assert!(done);
        assert_eq!(full, "第一章");
        assert_eq!(rx.recv().await.as_deref(), Some("第一"));
        assert_eq!(rx.recv().await.as_deref(), Some("章"));
    }

    #[tokio::test]
    async fn test_error_frame_and_malformed_json() {
        let (tx, _rx) = mpsc::channel(8);
        let mut full = String::new();

        let err = apply_frames(
            vec![SseFrame::Data(r#"{"error":{"message":"quota","code":429}}"#.to_string())],
            &mut full,
            &tx,
            content,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GenerationError::Provider { status: 429, .. }));

        let err = apply_frames(vec![SseFrame::Data("{not json".to_string())], &mut full, &tx, content)
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::MalformedStream(_)));
    }
}

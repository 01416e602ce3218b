//! 日志输出：把 `tracing` 事件写到浏览器控制台。

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;

/// 接收一行已格式化的日志。
pub type ConsoleSink = fn(Level, &str);

/// 缓冲一条事件，析构时整行交给 sink。
pub struct ConsoleWriter {
    level: Level,
    buffer: Vec<u8>,
    sink: ConsoleSink,
}

impl io::Write for ConsoleWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleWriter {
    fn drop(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buffer);
        (self.sink)(self.level, line.trim_end());
    }
}

#[derive(Clone, Copy)]
pub struct ConsoleMakeWriter {
    sink: ConsoleSink,
}

impl ConsoleMakeWriter {
    pub fn new(sink: ConsoleSink) -> Self {
        Self { sink }
    }
}

impl Default for ConsoleMakeWriter {
    fn default() -> Self {
        Self::new(console_sink)
    }
}

impl<'a> MakeWriter<'a> for ConsoleMakeWriter {
    type Writer = ConsoleWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ConsoleWriter {
            level: Level::INFO,
            buffer: Vec::new(),
            sink: self.sink,
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        ConsoleWriter {
            level: *meta.level(),
            buffer: Vec::new(),
            sink: self.sink,
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn console_sink(level: Level, line: &str) {
    let value = wasm_bindgen::JsValue::from_str(line);
    match level {
        Level::ERROR => web_sys::console::error_1(&value),
        Level::WARN => web_sys::console::warn_1(&value),
        Level::INFO => web_sys::console::info_1(&value),
        _ => web_sys::console::debug_1(&value),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn console_sink(_level: Level, line: &str) {
    eprintln!("{line}");
}

/// 构造写入给定 sink 的订阅者。wasm 上没有系统时钟，不输出时间戳。
pub fn console_subscriber(max_level: Level, writer: ConsoleMakeWriter) -> impl tracing::Subscriber + Send + Sync {
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_max_level(max_level)
        .with_ansi(false)
        .without_time()
        .finish()
}

/// 安装全局订阅者；重复调用保留第一次的设置。
pub fn init_console_logging(max_level: Level) {
    let subscriber = console_subscriber(max_level, ConsoleMakeWriter::default());
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("console logging already installed");
    }
}

use std::io::{BufRead, BufReader, BufWriter, Stdin, Stdout, Write};

use column_store::error::{AppError, AppResult};

pub struct NdjsonIo<R, W> {
    reader: R,
    writer: W,
}

impl NdjsonIo<BufReader<Stdin>, BufWriter<Stdout>> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(std::io::stdin()), BufWriter::new(std::io::stdout()))
    }
}

impl<R: BufRead, W: Write> NdjsonIo<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Next line without its terminator; `None` at end of input.
    pub fn read_line(&mut self) -> AppResult<Option<String>> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line)?;
        if n == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(&['\r', '\n'][..]);
        if line.trim().is_empty() {
            return Ok(Some(String::new()));
        }
        Ok(Some(line.to_string()))
    }

    pub fn write_json_line<T: serde::Serialize>(&mut self, v: &T) -> AppResult<()> {
        serde_json::to_writer(&mut self.writer, v)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn protocol_error(&mut self, v: u32, msg: String) -> AppResult<()> {
        let e = AppError::InvalidRequest(msg);
        let r = super::protocol::BridgeResponse::<()>::err(v, String::new(), e.code(), e.to_string());
        self.write_json_line(&r)
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.writer
    }
}

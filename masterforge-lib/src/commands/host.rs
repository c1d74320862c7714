use std::io::Write;

/// Process environment a command reports to.
///
/// Commands never touch stdout, stderr or the process exit code directly, so the
/// whole pipeline can run in-process under test.
pub trait Host: Send + Sync {
    /// Stream for reports and generated listings
    fn output(&mut self) -> impl Write;

    /// Stream for skips, warnings and failures
    fn error(&mut self) -> impl Write;

    /// Sets the process result. A test host records the code and returns.
    fn exit(&mut self, code: i32);
}

/// Test host that captures output to in-memory buffers
#[cfg(test)]
#[derive(Debug, Default)]
pub struct TestHost {
    pub output_buf: Vec<u8>,
    pub error_buf: Vec<u8>,
    pub exit_code: Option<i32>,
}

#[cfg(test)]
impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output_buf).into_owned()
    }

    pub fn error_str(&self) -> String {
        String::from_utf8_lossy(&self.error_buf).into_owned()
    }
}

#[cfg(test)]
impl Host for TestHost {
    fn output(&mut self) -> impl Write {
        &mut self.output_buf
    }

    fn error(&mut self) -> impl Write {
        &mut self.error_buf
    }

    fn exit(&mut self, code: i32) {
        // first code wins, like a real process
        let _ = self.exit_code.get_or_insert(code);
    }
}

//! Helpers shared by the unit tests.

/// Build a header block from `headers` followed by `payload`.
pub(crate) fn header_input(headers: &[(&str, &str)], payload: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    for (key, value) in headers {
        data.extend_from_slice(format!("{key}:{value}\n").as_bytes());
    }
    data.push(b'\n');
    data.extend_from_slice(payload);
    data
}

/// Collects every header line handed to its callback.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
}

impl Recorder {
    pub(crate) fn callback(&mut self) -> impl FnMut(&[u8], &[u8]) + '_ {
        move |key: &[u8], value: &[u8]| self.pairs.push((key.to_vec(), value.to_vec()))
    }

    pub(crate) fn pairs(&self) -> Vec<(&str, &str)> {
        self.pairs
            .iter()
            .map(|(k, v)| {
                (
                    std::str::from_utf8(k).unwrap(),
                    std::str::from_utf8(v).unwrap(),
                )
            })
            .collect()
    }
}

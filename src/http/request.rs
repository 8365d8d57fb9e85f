pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

pub fn parse_request_line(header: &str) -> Option<(&str, &str)> {
    let first_line = header.lines().next()?;
    let mut parts = first_line.split_ascii_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let _version = parts.next()?;
    Some((method, target))
}

pub fn parse_content_length(header: &str) -> Result<Option<usize>, &'static str> {
    let mut content_length = None;

    for line in header.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };

        if !name.eq_ignore_ascii_case("content-length") {
            continue;
        }

        let parsed = value
            .trim()
            .parse::<usize>()
            .map_err(|_| "invalid content-length")?;

        if content_length.is_some() {
            return Err("duplicate content-length");
        }

        content_length = Some(parsed);
    }

    Ok(content_length)
}

pub fn target_path(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

pub fn parse_header_value<'a>(header: &'a str, wanted_name: &str) -> Option<&'a str> {
    for line in header.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };

        if name.trim().eq_ignore_ascii_case(wanted_name) {
            return Some(value.trim());
        }
    }

    None
}

/// Comma-separated header lists such as `Connection: keep-alive, Upgrade`.
pub fn header_has_token(header: &str, name: &str, token: &str) -> bool {
    parse_header_value(header, name).is_some_and(|value| {
        value
            .split(',')
            .any(|item| item.trim().eq_ignore_ascii_case(token))
    })
}

/// Parsed request head; borrows the header text.
#[derive(Clone, Copy, Debug)]
pub struct RequestHead<'a> {
    pub method: &'a str,
    pub target: &'a str,
    pub content_length: Option<usize>,
    header: &'a str,
}

impl<'a> RequestHead<'a> {
    pub fn parse(header: &'a str) -> Result<Self, &'static str> {
        let (method, target) = parse_request_line(header).ok_or("bad request line")?;
        let content_length = parse_content_length(header)?;
        Ok(Self {
            method,
            target,
            content_length,
            header,
        })
    }

    pub fn path(&self) -> &'a str {
        target_path(self.target)
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        parse_header_value(self.header, name)
    }

    pub fn is_websocket_upgrade(&self) -> bool {
        header_has_token(self.header, "upgrade", "websocket")
            && header_has_token(self.header, "connection", "upgrade")
    }

    pub fn websocket_key(&self) -> Option<&'a str> {
        self.header("sec-websocket-key")
    }
}

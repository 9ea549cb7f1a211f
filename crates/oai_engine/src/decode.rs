use std::fmt::Display;

use engine_logging::{engine_trace, engine_warn};
use oai_core::{
    HarvestResponse, Header, ListIdentifiers, ListRecords, Listing, ProtocolError, Record,
    ResumptionToken,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

const ROOT: &str = "OAI-PMH";

type XmlReader<'a> = Reader<&'a [u8]>;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("malformed xml near byte {position}: {message}")]
    Malformed { position: u64, message: String },
    #[error("unexpected root element <{0}>, expected <OAI-PMH>")]
    UnexpectedRoot(String),
    #[error("no OAI-PMH envelope in response body")]
    MissingEnvelope,
}

/// Clean a raw body before parsing: newlines become spaces, then every
/// non-printable character is dropped.
pub fn normalize(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .replace('\n', " ")
        .chars()
        .filter(|c| is_printable(*c))
        .collect()
}

/// Printable means graphic or the ASCII space. Controls, other whitespace,
/// format characters (Cf), private use and the FFFE/FFFF noncharacters are
/// dropped.
///
/// This approximates a general-category check without a Unicode table:
/// unassigned code points and the private-use planes 15 and 16 are kept,
/// although a strict letter/mark/number/punctuation/symbol filter would drop
/// them.
fn is_printable(c: char) -> bool {
    if c == ' ' {
        return true;
    }
    if c.is_control() || c.is_whitespace() {
        return false;
    }
    !matches!(
        c,
        '\u{00AD}'
            | '\u{0600}'..='\u{0605}'
            | '\u{061C}'
            | '\u{06DD}'
            | '\u{070F}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{E000}'..='\u{F8FF}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
            | '\u{FFFE}'
            | '\u{FFFF}'
    )
}

/// Normalize and parse an OAI-PMH response body.
pub fn decode_response(body: &[u8]) -> Result<HarvestResponse, DecodeError> {
    let text = normalize(body);
    engine_trace!("decoding {} normalized chars", text.len());
    parse_envelope(&text)
}

fn parse_envelope(xml: &str) -> Result<HarvestResponse, DecodeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event().map_err(|err| malformed(&reader, err))? {
            Event::Start(start) => {
                expect_root(&start)?;
                return parse_root(&mut reader);
            }
            Event::Empty(start) => {
                expect_root(&start)?;
                return Ok(HarvestResponse::default());
            }
            Event::Eof => return Err(DecodeError::MissingEnvelope),
            _ => {}
        }
    }
}

fn expect_root(start: &BytesStart<'_>) -> Result<(), DecodeError> {
    let name = local_name(start);
    if name == ROOT {
        Ok(())
    } else {
        Err(DecodeError::UnexpectedRoot(name))
    }
}

fn parse_root(reader: &mut XmlReader<'_>) -> Result<HarvestResponse, DecodeError> {
    let mut response = HarvestResponse::default();

    loop {
        match next_event(reader)? {
            Event::Start(start) => match local_name(&start).as_str() {
                "responseDate" => response.response_date = Some(read_text(reader)?),
                "error" => {
                    let code = attribute(reader, &start, "code")?.unwrap_or_default();
                    let message = read_text(reader)?;
                    record_error(&mut response, ProtocolError { code, message });
                }
                "ListIdentifiers" => {
                    let list = read_list_identifiers(reader)?;
                    set_listing(&mut response, Listing::Identifiers(list));
                }
                "ListRecords" => {
                    let list = read_list_records(reader)?;
                    set_listing(&mut response, Listing::Records(list));
                }
                _ => skip(reader, &start)?,
            },
            Event::Empty(start) => match local_name(&start).as_str() {
                "error" => {
                    let code = attribute(reader, &start, "code")?.unwrap_or_default();
                    record_error(
                        &mut response,
                        ProtocolError {
                            code,
                            message: String::new(),
                        },
                    );
                }
                "ListIdentifiers" => {
                    set_listing(&mut response, Listing::Identifiers(ListIdentifiers::default()))
                }
                "ListRecords" => set_listing(&mut response, Listing::Records(ListRecords::default())),
                _ => {}
            },
            Event::End(_) => return Ok(response),
            _ => {}
        }
    }
}

fn record_error(response: &mut HarvestResponse, error: ProtocolError) {
    if response.error.is_some() {
        engine_warn!("ignoring additional protocol error {}: {}", error.code, error.message);
        return;
    }
    response.error = Some(error);
}

/// ListIdentifiers wins when a body carries both list containers.
fn set_listing(response: &mut HarvestResponse, listing: Listing) {
    let replace = match (&response.listing, &listing) {
        (None, _) => true,
        (Some(Listing::Records(_)), Listing::Identifiers(_)) => true,
        _ => false,
    };
    if response.listing.is_some() {
        engine_warn!(
            "response carries more than one list container; keeping {}",
            if replace {
                listing.verb()
            } else {
                response.listing.as_ref().map_or(listing.verb(), Listing::verb)
            }
        );
    }
    if replace {
        response.listing = Some(listing);
    }
}

fn read_list_identifiers(reader: &mut XmlReader<'_>) -> Result<ListIdentifiers, DecodeError> {
    let mut list = ListIdentifiers::default();
    loop {
        match next_event(reader)? {
            Event::Start(start) => match local_name(&start).as_str() {
                "header" => list.headers.push(read_header(reader, &start)?),
                "resumptionToken" => {
                    list.resumption_token = Some(read_resumption_token(reader, &start, false)?)
                }
                _ => skip(reader, &start)?,
            },
            Event::Empty(start) => match local_name(&start).as_str() {
                "resumptionToken" => {
                    list.resumption_token = Some(read_resumption_token(reader, &start, true)?)
                }
                "header" => list.headers.push(empty_header(reader, &start)?),
                _ => {}
            },
            Event::End(_) => return Ok(list),
            _ => {}
        }
    }
}

fn read_list_records(reader: &mut XmlReader<'_>) -> Result<ListRecords, DecodeError> {
    let mut list = ListRecords::default();
    loop {
        match next_event(reader)? {
            Event::Start(start) => match local_name(&start).as_str() {
                "record" => list.records.push(read_record(reader)?),
                "resumptionToken" => {
                    list.resumption_token = Some(read_resumption_token(reader, &start, false)?)
                }
                _ => skip(reader, &start)?,
            },
            Event::Empty(start) => {
                if local_name(&start) == "resumptionToken" {
                    list.resumption_token = Some(read_resumption_token(reader, &start, true)?);
                }
            }
            Event::End(_) => return Ok(list),
            _ => {}
        }
    }
}

fn read_record(reader: &mut XmlReader<'_>) -> Result<Record, DecodeError> {
    let mut record = Record::default();
    loop {
        match next_event(reader)? {
            Event::Start(start) => match local_name(&start).as_str() {
                "header" => record.header = read_header(reader, &start)?,
                "metadata" => {
                    let inner = reader
                        .read_text(start.name())
                        .map_err(|err| malformed(reader, err))?;
                    record.metadata = Some(inner.trim().to_string());
                }
                _ => skip(reader, &start)?,
            },
            Event::Empty(start) => match local_name(&start).as_str() {
                "header" => record.header = empty_header(reader, &start)?,
                "metadata" => record.metadata = Some(String::new()),
                _ => {}
            },
            Event::End(_) => return Ok(record),
            _ => {}
        }
    }
}

fn empty_header(reader: &XmlReader<'_>, start: &BytesStart<'_>) -> Result<Header, DecodeError> {
    Ok(Header {
        deleted: attribute(reader, start, "status")?.as_deref() == Some("deleted"),
        ..Header::default()
    })
}

fn read_header(reader: &mut XmlReader<'_>, start: &BytesStart<'_>) -> Result<Header, DecodeError> {
    let mut header = empty_header(reader, start)?;
    loop {
        match next_event(reader)? {
            Event::Start(child) => match local_name(&child).as_str() {
                "identifier" => header.identifier = read_text(reader)?.trim().to_string(),
                "datestamp" => header.datestamp = read_text(reader)?.trim().to_string(),
                "setSpec" => header.set_specs.push(read_text(reader)?.trim().to_string()),
                _ => skip(reader, &child)?,
            },
            Event::End(_) => return Ok(header),
            _ => {}
        }
    }
}

fn read_resumption_token(
    reader: &mut XmlReader<'_>,
    start: &BytesStart<'_>,
    empty: bool,
) -> Result<ResumptionToken, DecodeError> {
    let cursor = attribute(reader, start, "cursor")?;
    let complete_list_size = attribute(reader, start, "completeListSize")?;
    let expiration_date = attribute(reader, start, "expirationDate")?;
    let token = if empty {
        String::new()
    } else {
        read_text(reader)?.trim().to_string()
    };
    Ok(ResumptionToken {
        token,
        cursor,
        complete_list_size,
        expiration_date,
    })
}

/// Text content of the element whose start tag was just read. Nested
/// elements are skipped.
fn read_text(reader: &mut XmlReader<'_>) -> Result<String, DecodeError> {
    let mut text = String::new();
    loop {
        match next_event(reader)? {
            Event::Text(chunk) => {
                let chunk = chunk.unescape().map_err(|err| malformed(reader, err))?;
                text.push_str(&chunk);
            }
            Event::CData(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
            Event::Start(nested) => skip(reader, &nested)?,
            Event::End(_) => return Ok(text),
            _ => {}
        }
    }
}

fn attribute(
    reader: &XmlReader<'_>,
    start: &BytesStart<'_>,
    name: &str,
) -> Result<Option<String>, DecodeError> {
    for attr in start.attributes() {
        let attr = attr.map_err(|err| malformed(reader, err))?;
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(|err| malformed(reader, err))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn skip(reader: &mut XmlReader<'_>, start: &BytesStart<'_>) -> Result<(), DecodeError> {
    reader
        .read_to_end(start.name())
        .map_err(|err| malformed(reader, err))?;
    Ok(())
}

/// Next event inside the envelope; running out of input there is malformed.
fn next_event<'a>(reader: &mut XmlReader<'a>) -> Result<Event<'a>, DecodeError> {
    match reader.read_event() {
        Ok(Event::Eof) => Err(malformed(reader, "unexpected end of document")),
        Ok(event) => Ok(event),
        Err(err) => Err(malformed(reader, err)),
    }
}

fn local_name(start: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(start.local_name().as_ref()).into_owned()
}

fn malformed(reader: &XmlReader<'_>, err: impl Display) -> DecodeError {
    DecodeError::Malformed {
        position: reader.buffer_position() as u64,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_and_control_bytes_are_dropped() {
        assert_eq!(normalize(b"a\tb\x07c\r\nd"), "abc d");
    }

    #[test]
    fn non_ascii_letters_survive() {
        assert_eq!(normalize("Gödel\u{00A0}Escher".as_bytes()), "GödelEscher");
        assert_eq!(normalize("\u{FEFF}<x/>".as_bytes()), "<x/>");
    }

    #[test]
    fn format_and_private_use_characters_are_dropped() {
        let raw = "a\u{00AD}b\u{200B}c\u{202E}d\u{2066}e\u{E000}f\u{FFFE}g";
        assert_eq!(normalize(raw.as_bytes()), "abcdefg");
    }

    #[test]
    fn graphic_characters_from_other_scripts_are_kept() {
        let raw = "\u{0391}\u{05D0}\u{0915}\u{093F}\u{4E2D}\u{00BD}\u{20AC}\u{2014}";
        assert_eq!(normalize(raw.as_bytes()), raw);
    }

    #[test]
    fn unassigned_code_points_pass_through() {
        assert_eq!(normalize("x\u{0378}y".as_bytes()), "x\u{0378}y");
    }

    #[test]
    fn invalid_utf8_is_replaced_not_rejected() {
        assert_eq!(normalize(b"ok\xFFok"), "ok\u{FFFD}ok");
    }
}

//! Placeholder substitution over WordprocessingML.
//!
//! Word splits a single visible word across multiple `w:r` runs whenever
//! formatting, spell-check state, or edit history changes mid-word, so a
//! per-run substring search would miss slots that span a run boundary. Each
//! paragraph is therefore normalized first: all run text is concatenated into
//! one logical string, every run is cleared, and the full string lands in the
//! first run only (the first run's formatting wins). Substitution is then a
//! plain substring replacement on the normalized text.
//!
//! Table cells contain ordinary `w:p` paragraphs, so a single document-order
//! pass over `w:p` elements covers the document body and every table cell
//! alike. Textboxes (`w:pict`/`w:txbxContent`) nest whole paragraphs inside a
//! run of the enclosing paragraph; those are buffered together with their
//! host but normalized and substituted on their own, so textbox text never
//! migrates into the host run and host slots after a textbox are still found.

use std::io::Cursor;

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesStart, BytesText, Event};

use crate::error::{Error, Result};

/// Rewrite `word/document.xml`, replacing every slot occurrence.
///
/// Replacement is applied once per (slot, value) pair, in pair order. A value
/// that itself contains a later slot's name will be re-matched by that later
/// pair; this order-dependent behavior is accepted and pinned by tests.
///
/// The container's structural shape is preserved: same paragraphs, tables,
/// rows, cells, and textboxes, with only run text rewritten.
pub fn substitute_placeholders(
    document_xml: &[u8],
    placeholders: &[(String, String)],
) -> Result<Vec<u8>> {
    let mut reader = Reader::from_reader(document_xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(invalid_xml)? {
            Event::Eof => break,
            Event::Start(e) if e.name().as_ref() == b"w:p" => {
                let paragraph = collect_paragraph(&mut reader, Event::Start(e.into_owned()))?;
                write_paragraph(&mut writer, paragraph, placeholders)?;
            }
            event => writer.write_event(event).map_err(invalid_xml)?,
        }
        buf.clear();
    }

    Ok(writer.into_inner().into_inner())
}

/// Buffer all events of one paragraph, from its `w:p` start tag through the
/// matching end tag.
///
/// Tracks nesting depth: a textbox paragraph inside this one pushes the
/// depth, so the collector stops at the outer paragraph's own end tag, not
/// the first `</w:p>` it sees.
fn collect_paragraph(
    reader: &mut Reader<&[u8]>,
    start: Event<'static>,
) -> Result<Vec<Event<'static>>> {
    let mut events = vec![start];
    let mut depth = 1_usize;
    let mut buf = Vec::new();

    loop {
        let event = reader.read_event_into(&mut buf).map_err(invalid_xml)?;
        match event {
            Event::Eof => {
                return Err(Error::TemplateInvalid(
                    "unterminated w:p element in document.xml".to_string(),
                ));
            }
            Event::Start(ref e) if e.name().as_ref() == b"w:p" => {
                depth += 1;
                events.push(event.into_owned());
            }
            Event::End(ref e) if e.name().as_ref() == b"w:p" => {
                depth -= 1;
                events.push(event.into_owned());
                if depth == 0 {
                    return Ok(events);
                }
            }
            other => events.push(other.into_owned()),
        }
        buf.clear();
    }
}

/// One piece of a buffered paragraph: either a plain event belonging to the
/// paragraph itself, or a complete nested paragraph.
enum Segment {
    Event(Event<'static>),
    Paragraph(Vec<Event<'static>>),
}

/// Split a buffered paragraph into its own events and nested paragraph
/// groups, preserving document order.
fn split_nested(events: Vec<Event<'static>>) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut iter = events.into_iter();

    // The first event is this paragraph's own start tag
    if let Some(start) = iter.next() {
        segments.push(Segment::Event(start));
    }

    while let Some(event) = iter.next() {
        if matches!(&event, Event::Start(e) if e.name().as_ref() == b"w:p") {
            let mut nested = vec![event];
            let mut depth = 1_usize;
            for inner in iter.by_ref() {
                match &inner {
                    Event::Start(e) if e.name().as_ref() == b"w:p" => depth += 1,
                    Event::End(e) if e.name().as_ref() == b"w:p" => depth -= 1,
                    _ => {}
                }
                let closed = depth == 0;
                nested.push(inner);
                if closed {
                    break;
                }
            }
            segments.push(Segment::Paragraph(nested));
        } else {
            segments.push(Segment::Event(event));
        }
    }

    segments
}

/// Emit one paragraph with runs normalized and slots substituted. Nested
/// paragraphs are handled recursively, each with its own normalization.
fn write_paragraph(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    events: Vec<Event<'static>>,
    placeholders: &[(String, String)],
) -> Result<()> {
    let segments = split_nested(events);

    let full_text = paragraph_text(&segments)?;
    let mut new_text = full_text;
    for (slot, value) in placeholders {
        if new_text.contains(slot.as_str()) {
            new_text = new_text.replace(slot.as_str(), value);
        }
    }

    let mut first_text_written = false;
    let mut inside_text = false;

    for segment in segments {
        let event = match segment {
            Segment::Paragraph(nested) => {
                write_paragraph(writer, nested, placeholders)?;
                continue;
            }
            Segment::Event(event) => event,
        };

        match event {
            Event::Start(e) if e.name().as_ref() == b"w:t" => {
                inside_text = true;
                if first_text_written {
                    // Later runs end up empty after normalization
                    writer
                        .write_event(Event::Empty(BytesStart::new("w:t")))
                        .map_err(invalid_xml)?;
                } else {
                    first_text_written = true;
                    write_normalized_text(writer, &e, &new_text)?;
                }
            }
            Event::Empty(e) if e.name().as_ref() == b"w:t" => {
                if first_text_written {
                    writer
                        .write_event(Event::Empty(BytesStart::new("w:t")))
                        .map_err(invalid_xml)?;
                } else {
                    first_text_written = true;
                    write_normalized_text(writer, &e, &new_text)?;
                }
            }
            Event::End(e) if e.name().as_ref() == b"w:t" => {
                inside_text = false;
            }
            Event::Text(_) | Event::CData(_) if inside_text => {
                // Original run text is superseded by the normalized string
            }
            other => writer.write_event(other).map_err(invalid_xml)?,
        }
    }

    Ok(())
}

/// Emit the first run's `w:t` element carrying the full normalized text.
fn write_normalized_text(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    original: &BytesStart<'_>,
    text: &str,
) -> Result<()> {
    writer
        .write_event(Event::Start(preserving_space(original)))
        .map_err(invalid_xml)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(invalid_xml)?;
    writer
        .write_event(Event::End(BytesStart::new("w:t").to_end().into_owned()))
        .map_err(invalid_xml)?;
    Ok(())
}

/// Concatenate the visible text of this paragraph's own runs. Nested
/// paragraph segments are skipped; their text belongs to them.
fn paragraph_text(segments: &[Segment]) -> Result<String> {
    let mut text = String::new();
    let mut inside_text = false;

    for segment in segments {
        let Segment::Event(event) = segment else {
            continue;
        };
        match event {
            Event::Start(e) if e.name().as_ref() == b"w:t" => inside_text = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => inside_text = false,
            Event::Text(t) if inside_text => {
                text.push_str(&t.unescape().map_err(invalid_xml)?);
            }
            Event::CData(c) if inside_text => {
                text.push_str(&String::from_utf8_lossy(c.as_ref()));
            }
            _ => {}
        }
    }

    Ok(text)
}

/// First run's `w:t` start tag, forced to preserve significant whitespace.
///
/// Replacement values may carry leading or trailing spaces that Word would
/// otherwise strip on load.
fn preserving_space(original: &BytesStart<'_>) -> BytesStart<'static> {
    let mut tag = BytesStart::new("w:t");
    let has_space_attr = original
        .attributes()
        .filter_map(std::result::Result::ok)
        .any(|a| a.key.as_ref() == b"xml:space");
    if has_space_attr {
        for attr in original.attributes().filter_map(std::result::Result::ok) {
            tag.push_attribute((
                String::from_utf8_lossy(attr.key.as_ref()).into_owned().as_str(),
                String::from_utf8_lossy(&attr.value).into_owned().as_str(),
            ));
        }
    } else {
        tag.push_attribute(("xml:space", "preserve"));
    }
    tag
}

fn invalid_xml(e: quick_xml::Error) -> Error {
    Error::TemplateInvalid(format!("malformed document.xml: {e}"))
}

//! Text runs in drawing order.
//!
//! [`TextRuns`] interprets the text operators of a page lazily. Form
//! XObjects painted with `Do` are entered in place, with an implicit `q`/`Q`
//! around them, so their text appears where it is drawn.

use std::collections::HashMap;
use std::rc::Rc;

use crate::content::operators::{Operator, TextElement};
use crate::content::parser::next_operator;
use crate::document::{Document, Page};
use crate::error::Result;
use crate::fonts::FontDecoder;
use crate::object::{Dictionary, ObjectRef, PdfValue};

/// Kerning adjustment (thousandths of text space) above which a `TJ` gap
/// counts as a word break.
const WORD_GAP: f64 = 250.0;

/// A piece of text shown by one text-showing operator.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    /// Decoded text. Starts with `\n` when the operator moved to a new line.
    pub text: String,
    /// `/BaseFont` of the font, or its resource name when that is unknown
    pub font: String,
    /// Font size from `Tf`
    pub font_size: f64,
}

#[derive(Debug, Clone, Default)]
struct TextState {
    font: Option<Rc<FontDecoder>>,
    font_name: String,
    font_size: f64,
}

/// One content stream being interpreted: the page itself or a form XObject.
#[derive(Debug)]
struct Frame {
    data: Vec<u8>,
    pos: usize,
    resources: Dictionary,
    fonts: HashMap<String, Rc<FontDecoder>>,
    /// Form XObject this frame interprets
    form: Option<ObjectRef>,
    /// State stack depth at entry
    base_depth: usize,
}

/// Lazy iterator over the text runs of a page.
#[derive(Debug)]
pub struct TextRuns<'d> {
    doc: &'d Document,
    frames: Vec<Frame>,
    state: TextState,
    saved: Vec<TextState>,
    line_y: f64,
    new_line: bool,
    emitted: bool,
}

impl<'d> TextRuns<'d> {
    /// Decode the page's content streams and prepare to interpret them.
    pub fn new(doc: &'d Document, page: &Page) -> Result<Self> {
        let data = doc.page_contents(page)?;
        let resources = match page.resources() {
            Some(res) => doc.resolve_dict(res)?,
            None => Dictionary::new(),
        };
        Ok(Self {
            doc,
            frames: vec![Frame {
                data,
                pos: 0,
                resources,
                fonts: HashMap::new(),
                form: None,
                base_depth: 0,
            }],
            state: TextState::default(),
            saved: Vec::new(),
            line_y: 0.0,
            new_line: false,
            emitted: false,
        })
    }

    fn next_op(&mut self) -> Option<Operator> {
        loop {
            let frame = self.frames.last_mut()?;
            match next_operator(&frame.data[frame.pos..]) {
                Some((rest, op)) => {
                    frame.pos = frame.data.len() - rest.len();
                    return Some(op);
                },
                None => self.leave_frame(),
            }
        }
    }

    fn leave_frame(&mut self) {
        if let Some(frame) = self.frames.pop() {
            if frame.form.is_some() {
                // implicit Q after a form XObject
                self.saved.truncate(frame.base_depth);
                if let Some(state) = self.saved.pop() {
                    self.state = state;
                }
            }
        }
    }

    fn select_font(&mut self, name: &str, size: f64) {
        self.state.font_size = size;
        let Some(frame) = self.frames.last_mut() else {
            return;
        };
        if let Some(decoder) = frame.fonts.get(name) {
            self.state.font_name = display_name(decoder, name);
            self.state.font = Some(Rc::clone(decoder));
            return;
        }

        let font_dict = frame
            .resources
            .get("Font")
            .map(|fonts| self.doc.resolve_dict(fonts))
            .transpose()
            .and_then(|fonts| {
                fonts
                    .and_then(|f| f.get(name).cloned())
                    .map(|font| self.doc.resolve_dict(&font))
                    .transpose()
            });
        let decoder = match font_dict {
            Ok(Some(dict)) => Rc::new(FontDecoder::load(self.doc, &dict)),
            Ok(None) => {
                log::warn!("Font /{} not found in resources", name);
                Rc::new(FontDecoder::default())
            },
            Err(e) => {
                log::warn!("Font /{} unreadable: {}", name, e);
                Rc::new(FontDecoder::default())
            },
        };
        frame.fonts.insert(name.to_string(), Rc::clone(&decoder));
        self.state.font_name = display_name(&decoder, name);
        self.state.font = Some(decoder);
    }

    fn enter_form(&mut self, name: &str) {
        let Some(frame) = self.frames.last() else {
            return;
        };
        let Some(reference) = frame
            .resources
            .get("XObject")
            .and_then(|x| self.doc.resolve_dict(x).ok())
            .and_then(|x| x.get(name).and_then(|v| v.as_reference()))
        else {
            log::debug!("XObject /{} not found in resources", name);
            return;
        };

        let max_depth = self.doc.options().max_recursion_depth as usize;
        if self.frames.len() > max_depth {
            log::warn!("Form XObject nesting deeper than {}; skipping /{}", max_depth, name);
            return;
        }
        if self.frames.iter().any(|f| f.form == Some(reference)) {
            log::warn!("Form XObject {} paints itself; skipping", reference);
            return;
        }

        let form = match self.doc.get_object(reference) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("XObject /{} unreadable: {}", name, e);
                return;
            },
        };
        let PdfValue::Stream { dict, .. } = &form else {
            return;
        };
        if dict.get("Subtype").and_then(|s| s.as_name()) != Some("Form") {
            return;
        }

        let data = match self.doc.decode_stream(&form) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("Form XObject {} could not be decoded: {}", reference, e);
                return;
            },
        };
        let resources = match dict.get("Resources").map(|r| self.doc.resolve_dict(r)) {
            Some(Ok(res)) => res,
            _ => frame.resources.clone(),
        };

        // implicit q before a form XObject
        self.saved.push(self.state.clone());
        self.frames.push(Frame {
            data,
            pos: 0,
            resources,
            fonts: HashMap::new(),
            form: Some(reference),
            base_depth: self.saved.len(),
        });
    }

    fn show(&mut self, bytes: &[u8]) -> String {
        match &self.state.font {
            Some(font) => font.decode(bytes),
            None => FontDecoder::default().decode(bytes),
        }
    }

    fn show_array(&mut self, array: &[TextElement]) -> String {
        let mut text = String::new();
        for element in array {
            match element {
                TextElement::String(bytes) => text.push_str(&self.show(bytes)),
                TextElement::Offset(adjust) => {
                    if -adjust > WORD_GAP && !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                },
            }
        }
        text
    }

    fn move_line(&mut self, ty: f64) {
        if ty != 0.0 {
            self.new_line = true;
        }
        self.line_y += ty;
    }

    fn run(&mut self, text: String) -> Option<TextRun> {
        if text.is_empty() {
            return None;
        }
        let text = if self.new_line && self.emitted {
            format!("\n{}", text)
        } else {
            text
        };
        self.new_line = false;
        self.emitted = true;
        Some(TextRun {
            text,
            font: self.state.font_name.clone(),
            font_size: self.state.font_size,
        })
    }
}

impl Iterator for TextRuns<'_> {
    type Item = TextRun;

    fn next(&mut self) -> Option<TextRun> {
        loop {
            let text = match self.next_op()? {
                Operator::Tf { font, size } => {
                    self.select_font(&font, size);
                    continue;
                },
                Operator::BeginText => {
                    self.line_y = 0.0;
                    continue;
                },
                Operator::Td { ty, .. } | Operator::TD { ty, .. } => {
                    self.move_line(ty);
                    continue;
                },
                Operator::Tm { f, .. } => {
                    if f != self.line_y {
                        self.new_line = true;
                    }
                    self.line_y = f;
                    continue;
                },
                Operator::TStar => {
                    self.new_line = true;
                    continue;
                },
                Operator::SaveState => {
                    self.saved.push(self.state.clone());
                    continue;
                },
                Operator::RestoreState => {
                    let floor = self.frames.last().map_or(0, |f| f.base_depth);
                    if self.saved.len() > floor {
                        if let Some(state) = self.saved.pop() {
                            self.state = state;
                        }
                    } else {
                        log::debug!("Unbalanced Q ignored");
                    }
                    continue;
                },
                Operator::Do { name } => {
                    self.enter_form(&name);
                    continue;
                },
                Operator::Tj { text } => self.show(&text),
                Operator::TJ { array } => self.show_array(&array),
                Operator::Quote { text } | Operator::DoubleQuote { text, .. } => {
                    self.new_line = true;
                    self.show(&text)
                },
                _ => continue,
            };
            if let Some(run) = self.run(text) {
                return Some(run);
            }
        }
    }
}

fn display_name(decoder: &FontDecoder, resource: &str) -> String {
    if decoder.base_font().is_empty() {
        resource.to_string()
    } else {
        decoder.base_font().to_string()
    }
}

//! Content stream operators.
//!
//! Only the operators that matter for text extraction get their own variant;
//! everything else is kept as [`Operator::Other`] with its operands.

use crate::object::{Dictionary, PdfValue};

/// A content stream operator with its operands.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Select font and size (Tf)
    Tf {
        /// Resource name of the font
        font: String,
        /// Font size in text space units
        size: f64,
    },
    /// Move text position (Td)
    Td {
        /// Horizontal offset
        tx: f64,
        /// Vertical offset
        ty: f64,
    },
    /// Move text position and set leading (TD)
    TD {
        /// Horizontal offset
        tx: f64,
        /// Vertical offset
        ty: f64,
    },
    /// Set text matrix (Tm)
    Tm {
        /// Matrix element a
        a: f64,
        /// Matrix element b
        b: f64,
        /// Matrix element c
        c: f64,
        /// Matrix element d
        d: f64,
        /// Matrix element e (x translation)
        e: f64,
        /// Matrix element f (y translation)
        f: f64,
    },
    /// Move to start of next line (T*)
    TStar,
    /// Set leading (TL)
    TL {
        /// Leading
        leading: f64,
    },
    /// Show text string (Tj)
    Tj {
        /// Raw string bytes
        text: Vec<u8>,
    },
    /// Show strings with positioning adjustments (TJ)
    TJ {
        /// Strings and adjustments in order
        array: Vec<TextElement>,
    },
    /// Move to next line and show text (')
    Quote {
        /// Raw string bytes
        text: Vec<u8>,
    },
    /// Set spacing, move to next line and show text (")
    DoubleQuote {
        /// Word spacing
        word_space: f64,
        /// Character spacing
        char_space: f64,
        /// Raw string bytes
        text: Vec<u8>,
    },
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Paint an XObject (Do)
    Do {
        /// Resource name of the XObject
        name: String,
    },
    /// Inline image (BI ... ID ... EI)
    InlineImage {
        /// Image dictionary with abbreviated keys
        dict: Dictionary,
        /// Image bytes between ID and EI
        data: Vec<u8>,
    },
    /// Any other operator
    Other {
        /// Operator name
        name: String,
        /// Operands
        operands: Vec<PdfValue>,
    },
}

/// Element of a TJ array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextElement {
    /// String to show
    String(Vec<u8>),
    /// Adjustment in thousandths of a text space unit; positive moves left
    Offset(f64),
}

impl Operator {
    /// Build an operator from its name and the operands that preceded it.
    ///
    /// Missing or mistyped operands fall back to neutral values.
    pub fn from_parts(name: &str, operands: Vec<PdfValue>) -> Self {
        let num = |i: usize, default: f64| operands.get(i).and_then(|v| v.as_number()).unwrap_or(default);
        let string = |i: usize| {
            operands
                .get(i)
                .and_then(|v| v.as_string())
                .map(|s| s.to_vec())
                .unwrap_or_default()
        };

        match name {
            "BT" => Operator::BeginText,
            "ET" => Operator::EndText,
            "Tf" => Operator::Tf {
                font: operands
                    .first()
                    .and_then(|v| v.as_name())
                    .unwrap_or_default()
                    .to_string(),
                size: num(1, 12.0),
            },
            "Td" => Operator::Td {
                tx: num(0, 0.0),
                ty: num(1, 0.0),
            },
            "TD" => Operator::TD {
                tx: num(0, 0.0),
                ty: num(1, 0.0),
            },
            "Tm" => Operator::Tm {
                a: num(0, 1.0),
                b: num(1, 0.0),
                c: num(2, 0.0),
                d: num(3, 1.0),
                e: num(4, 0.0),
                f: num(5, 0.0),
            },
            "T*" => Operator::TStar,
            "TL" => Operator::TL { leading: num(0, 0.0) },
            "Tj" => Operator::Tj { text: string(0) },
            "TJ" => {
                let array = operands
                    .first()
                    .and_then(|v| v.as_array())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| match item {
                                PdfValue::String(s) => Some(TextElement::String(s.clone())),
                                PdfValue::Integer(_) | PdfValue::Real(_) => item.as_number().map(TextElement::Offset),
                                _ => None,
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                Operator::TJ { array }
            },
            "'" => Operator::Quote { text: string(0) },
            "\"" => Operator::DoubleQuote {
                word_space: num(0, 0.0),
                char_space: num(1, 0.0),
                text: string(2),
            },
            "q" => Operator::SaveState,
            "Q" => Operator::RestoreState,
            "Do" => Operator::Do {
                name: operands
                    .first()
                    .and_then(|v| v.as_name())
                    .unwrap_or_default()
                    .to_string(),
            },
            _ => Operator::Other {
                name: name.to_string(),
                operands,
            },
        }
    }

    /// Whether the operator paints text.
    pub fn shows_text(&self) -> bool {
        matches!(
            self,
            Operator::Tj { .. } | Operator::TJ { .. } | Operator::Quote { .. } | Operator::DoubleQuote { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_td() {
        let op = Operator::from_parts("Td", vec![PdfValue::Integer(100), PdfValue::Real(-14.5)]);
        assert_eq!(op, Operator::Td { tx: 100.0, ty: -14.5 });
    }

    #[test]
    fn test_operator_tf() {
        let op = Operator::from_parts("Tf", vec![PdfValue::name("F1"), PdfValue::Integer(12)]);
        assert_eq!(
            op,
            Operator::Tf {
                font: "F1".to_string(),
                size: 12.0
            }
        );
    }

    #[test]
    fn test_operator_tj_array() {
        let op = Operator::from_parts(
            "TJ",
            vec![PdfValue::Array(vec![
                PdfValue::string(b"A".to_vec()),
                PdfValue::Integer(-300),
                PdfValue::name("junk"),
                PdfValue::string(b"B".to_vec()),
            ])],
        );
        let Operator::TJ { array } = op else {
            panic!("expected TJ");
        };
        assert_eq!(array.len(), 3);
        assert_eq!(array[1], TextElement::Offset(-300.0));
    }

    #[test]
    fn test_missing_operands() {
        assert_eq!(Operator::from_parts("Tj", Vec::new()), Operator::Tj { text: Vec::new() });
        assert!(Operator::from_parts("'", Vec::new()).shows_text());
    }

    #[test]
    fn test_other() {
        let op = Operator::from_parts("re", vec![PdfValue::Integer(0); 4]);
        match op {
            Operator::Other { name, operands } => {
                assert_eq!(name, "re");
                assert_eq!(operands.len(), 4);
            },
            other => panic!("expected Other, got {:?}", other),
        }
    }
}

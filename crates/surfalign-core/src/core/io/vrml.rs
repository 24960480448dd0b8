//! Reader and writer for the VRML subset used for molecular surface geometry.
//!
//! Only the `point [ ... ]` fields of `Coordinate` nodes are interpreted. Every
//! such list in the file is read in order and concatenated; all other nodes,
//! fields and `#` comments are skipped.

use super::traits::PointCloudFile;
use nalgebra::Point3;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VrmlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: VrmlParseErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(String),
}

#[derive(Debug, Error)]
pub enum VrmlParseErrorKind {
    #[error("Invalid coordinate value '{value}'")]
    InvalidFloat { value: String },
    #[error("Coordinate list holds {values} values, which is not a multiple of 3")]
    IncompleteTriple { values: usize },
    #[error("Expected '{expected}' but found '{found}'")]
    UnexpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error("Unterminated list or node")]
    Unterminated,
}

struct Token {
    text: String,
    line: usize,
}

fn tokenize(reader: &mut impl BufRead) -> Result<Vec<Token>, io::Error> {
    let mut tokens = Vec::new();
    for (line_num, line_res) in reader.lines().enumerate() {
        let line = line_res?;
        let content = match line.find('#') {
            Some(pos) => &line[..pos],
            None => line.as_str(),
        };
        let mut current = String::new();
        for ch in content.chars() {
            match ch {
                '[' | ']' | '{' | '}' => {
                    if !current.is_empty() {
                        tokens.push(Token {
                            text: std::mem::take(&mut current),
                            line: line_num + 1,
                        });
                    }
                    tokens.push(Token {
                        text: ch.to_string(),
                        line: line_num + 1,
                    });
                }
                ',' => {
                    if !current.is_empty() {
                        tokens.push(Token {
                            text: std::mem::take(&mut current),
                            line: line_num + 1,
                        });
                    }
                }
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(Token {
                            text: std::mem::take(&mut current),
                            line: line_num + 1,
                        });
                    }
                }
                c => current.push(c),
            }
        }
        if !current.is_empty() {
            tokens.push(Token {
                text: current,
                line: line_num + 1,
            });
        }
    }
    Ok(tokens)
}

fn read_point_list(
    tokens: &[Token],
    start: usize,
    out: &mut Vec<Point3<f64>>,
) -> Result<usize, VrmlError> {
    let open = tokens.get(start).ok_or(VrmlError::Parse {
        line: tokens.last().map_or(0, |t| t.line),
        kind: VrmlParseErrorKind::Unterminated,
    })?;
    if open.text != "[" {
        return Err(VrmlError::Parse {
            line: open.line,
            kind: VrmlParseErrorKind::UnexpectedToken {
                expected: "[",
                found: open.text.clone(),
            },
        });
    }

    let mut values = Vec::new();
    let mut idx = start + 1;
    loop {
        let token = tokens.get(idx).ok_or(VrmlError::Parse {
            line: open.line,
            kind: VrmlParseErrorKind::Unterminated,
        })?;
        if token.text == "]" {
            break;
        }
        let value: f64 = token.text.parse().map_err(|_| VrmlError::Parse {
            line: token.line,
            kind: VrmlParseErrorKind::InvalidFloat {
                value: token.text.clone(),
            },
        })?;
        values.push(value);
        idx += 1;
    }

    if values.len() % 3 != 0 {
        return Err(VrmlError::Parse {
            line: open.line,
            kind: VrmlParseErrorKind::IncompleteTriple {
                values: values.len(),
            },
        });
    }
    out.extend(
        values
            .chunks_exact(3)
            .map(|c| Point3::new(c[0], c[1], c[2])),
    );
    Ok(idx + 1)
}

pub struct VrmlFile;

impl PointCloudFile for VrmlFile {
    type Data = Vec<Point3<f64>>;
    type Error = VrmlError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Data, Self::Error> {
        let tokens = tokenize(reader)?;
        let mut points = Vec::new();
        let mut found_coordinate = false;

        let mut depth = 0usize;
        // Brace depths at which an enclosing `Coordinate` node was opened.
        let mut coordinate_depths: Vec<usize> = Vec::new();
        let mut pending_coordinate = false;

        let mut idx = 0;
        while idx < tokens.len() {
            let token = &tokens[idx];
            match token.text.as_str() {
                "Coordinate" => pending_coordinate = true,
                "{" => {
                    depth += 1;
                    if pending_coordinate {
                        coordinate_depths.push(depth);
                        pending_coordinate = false;
                    }
                }
                "}" => {
                    if coordinate_depths.last() == Some(&depth) {
                        coordinate_depths.pop();
                    }
                    depth = depth.saturating_sub(1);
                }
                "point" if coordinate_depths.last() == Some(&depth) => {
                    found_coordinate = true;
                    idx = read_point_list(&tokens, idx + 1, &mut points)?;
                    continue;
                }
                _ => pending_coordinate = false,
            }
            idx += 1;
        }

        if depth != 0 || !coordinate_depths.is_empty() {
            return Err(VrmlError::Parse {
                line: tokens.last().map_or(0, |t| t.line),
                kind: VrmlParseErrorKind::Unterminated,
            });
        }
        if !found_coordinate {
            return Err(VrmlError::MissingRecord("Coordinate point field".into()));
        }
        Ok(points)
    }

    fn write_to(data: &Self::Data, writer: &mut impl Write) -> Result<(), Self::Error> {
        writeln!(writer, "#VRML V2.0 utf8")?;
        writeln!(writer, "Shape {{")?;
        writeln!(writer, "  geometry PointSet {{")?;
        writeln!(writer, "    coord Coordinate {{")?;
        writeln!(writer, "      point [")?;
        for p in data {
            writeln!(writer, "        {} {} {},", p.x, p.y, p.z)?;
        }
        writeln!(writer, "      ]")?;
        writeln!(writer, "    }}")?;
        writeln!(writer, "  }}")?;
        writeln!(writer, "}}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read(content: &str) -> Result<Vec<Point3<f64>>, VrmlError> {
        VrmlFile::read_from(&mut Cursor::new(content))
    }

    #[test]
    fn reads_points_from_indexed_face_set() {
        let content = r#"#VRML V2.0 utf8
# molecular surface
Transform {
  children [
    Shape {
      appearance Appearance { material Material { diffuseColor 1 0 0 } }
      geometry IndexedFaceSet {
        coord DEF surf Coordinate {
          point [ 0 0 0, 1.5 0 0,
                  0 -2 0.25 ]
        }
        coordIndex [ 0, 1, 2, -1 ]
      }
    }
  ]
}
"#;
        let points = read(content).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[1], Point3::new(1.5, 0.0, 0.0));
        assert_eq!(points[2], Point3::new(0.0, -2.0, 0.25));
    }

    #[test]
    fn concatenates_multiple_coordinate_nodes() {
        let content = "Shape { geometry PointSet { coord Coordinate { point [ 1 2 3 ] } } }\n\
                       Shape { geometry PointSet { coord Coordinate { point [ 4 5 6, 7 8 9 ] } } }";
        let points = read(content).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[2], Point3::new(7.0, 8.0, 9.0));
    }

    #[test]
    fn ignores_point_fields_outside_coordinate_nodes() {
        let content = "Foo { point [ 9 9 9 ] } Shape { geometry PointSet { coord Coordinate { point [ 1 1 1 ] } } }";
        let points = read(content).unwrap();
        assert_eq!(points, vec![Point3::new(1.0, 1.0, 1.0)]);
    }

    #[test]
    fn rejects_incomplete_triples() {
        let result = read("Coordinate { point [ 1 2 3, 4 5 ] }");
        assert!(matches!(
            result,
            Err(VrmlError::Parse {
                kind: VrmlParseErrorKind::IncompleteTriple { values: 5 },
                ..
            })
        ));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let result = read("Coordinate {\n point [ 1 2 x ]\n}");
        assert!(matches!(
            result,
            Err(VrmlError::Parse {
                line: 2,
                kind: VrmlParseErrorKind::InvalidFloat { .. }
            })
        ));
    }

    #[test]
    fn rejects_unterminated_list() {
        let result = read("Coordinate { point [ 1 2 3 ");
        assert!(matches!(
            result,
            Err(VrmlError::Parse {
                kind: VrmlParseErrorKind::Unterminated,
                ..
            })
        ));
    }

    #[test]
    fn missing_coordinate_is_an_error() {
        let result = read("#VRML V2.0 utf8\nShape { }");
        assert!(matches!(result, Err(VrmlError::MissingRecord(_))));
    }

    #[test]
    fn written_file_reads_back_identically() {
        let points = vec![
            Point3::new(0.1, -2.25, 3.0),
            Point3::new(1e-7, 4.0, -0.333333333333),
        ];
        let mut buffer = Vec::new();
        VrmlFile::write_to(&points, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("#VRML V2.0 utf8"));
        assert_eq!(read(&text).unwrap(), points);
    }
}

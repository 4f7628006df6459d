//! Parsers for the `::`-separated data files.
//!
//! - movies.dat: movieId::title[::anything else]
//! - embeddings.dat: movieId::v1,v2,...,vd
//! - ratings.dat: userId::movieId::rating[::timestamp]
//!
//! Each `parse_*` function reads a file; the `parse_*_str` variants work on
//! in-memory content so the format rules can be tested without touching disk.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fs;
use std::path::Path;

/// Read a whole file, converting invalid UTF-8 lossily.
fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Non-empty trimmed lines paired with their 1-based line number
fn numbered_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
}

fn parse_error(file: &str, line: usize, reason: impl Into<String>) -> DataLoadError {
    DataLoadError::ParseError {
        file: file.to_string(),
        line,
        reason: reason.into(),
    }
}

fn next_field<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    file: &str,
    line: usize,
    name: &str,
) -> Result<&'a str> {
    parts
        .next()
        .ok_or_else(|| parse_error(file, line, format!("Missing {}", name)))
}

fn parse_id(value: &str, file: &str, line: usize, name: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|e| parse_error(file, line, format!("Invalid {}: {}", name, e)))
}

/// Parse the movies file
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    parse_movies_str(&read_file(path)?, &file_label(path))
}

pub fn parse_movies_str(content: &str, file: &str) -> Result<Vec<Movie>> {
    let mut movies = Vec::new();
    for (line_no, line) in numbered_lines(content) {
        let mut parts = line.split("::");
        let movie_id = next_field(&mut parts, file, line_no, "movieId")?;
        let title = next_field(&mut parts, file, line_no, "title")?;
        if title.trim().is_empty() {
            return Err(parse_error(file, line_no, "Empty title"));
        }
        movies.push(Movie::new(
            parse_id(movie_id, file, line_no, "movieId")?,
            title.trim(),
        ));
    }
    Ok(movies)
}

/// Parse the embeddings file into (movieId, vector) pairs
pub fn parse_embeddings(path: &Path) -> Result<Vec<(MovieId, Vec<f32>)>> {
    parse_embeddings_str(&read_file(path)?, &file_label(path))
}

pub fn parse_embeddings_str(content: &str, file: &str) -> Result<Vec<(MovieId, Vec<f32>)>> {
    let mut embeddings = Vec::new();
    for (line_no, line) in numbered_lines(content) {
        let mut parts = line.split("::");
        let movie_id = next_field(&mut parts, file, line_no, "movieId")?;
        let vector = next_field(&mut parts, file, line_no, "embedding")?;

        let values = vector
            .split(',')
            .map(|v| {
                let value: f32 = v.trim().parse().map_err(|e| {
                    parse_error(file, line_no, format!("Invalid embedding value {:?}: {}", v, e))
                })?;
                if value.is_finite() {
                    Ok(value)
                } else {
                    Err(parse_error(file, line_no, "Non-finite embedding value"))
                }
            })
            .collect::<Result<Vec<f32>>>()?;

        embeddings.push((parse_id(movie_id, file, line_no, "movieId")?, values));
    }
    Ok(embeddings)
}

/// Parse a ratings file (historical or held-out)
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    parse_ratings_str(&read_file(path)?, &file_label(path))
}

pub fn parse_ratings_str(content: &str, file: &str) -> Result<Vec<Rating>> {
    let mut ratings = Vec::new();
    for (line_no, line) in numbered_lines(content) {
        let mut parts = line.split("::");
        let user_id = next_field(&mut parts, file, line_no, "userId")?;
        let movie_id = next_field(&mut parts, file, line_no, "movieId")?;
        let rating_value = next_field(&mut parts, file, line_no, "rating")?;

        let rating = parse_rating_value(rating_value)
            .ok_or_else(|| parse_error(file, line_no, format!("Invalid rating: {}", rating_value)))?;

        ratings.push(Rating {
            user_id: parse_id(user_id, file, line_no, "userId")?,
            movie_id: parse_id(movie_id, file, line_no, "movieId")?,
            rating,
        });
    }
    Ok(ratings)
}

/// Accepts "4" as well as "4.0"; anything fractional or out of range is rejected.
fn parse_rating_value(s: &str) -> Option<u8> {
    let s = s.trim();
    let value = match s.parse::<u8>() {
        Ok(v) => v,
        Err(_) => {
            let f: f32 = s.parse().ok()?;
            if f.fract() != 0.0 || !(0.0..=255.0).contains(&f) {
                return None;
            }
            f as u8
        }
    };
    is_valid_rating(value).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_movies_ignores_extra_fields() {
        let content = "1::Toy Story (1995)::Animation|Comedy\n\n2::Heat (1995)\n";
        let movies = parse_movies_str(content, "movies.dat").unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].title, "Toy Story (1995)");
        assert_eq!(movies[1].id, 2);
        assert!(movies[1].embedding.is_none());
    }

    #[test]
    fn test_parse_movies_reports_line() {
        let err = parse_movies_str("1::A\nx::B\n", "movies.dat").unwrap_err();
        match err {
            DataLoadError::ParseError { line, file, .. } => {
                assert_eq!(line, 2);
                assert_eq!(file, "movies.dat");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_embeddings() {
        let parsed = parse_embeddings_str("7::0.5, -1.0,2\n", "embeddings.dat").unwrap();
        assert_eq!(parsed, vec![(7, vec![0.5, -1.0, 2.0])]);

        assert!(parse_embeddings_str("7::0.5,abc\n", "embeddings.dat").is_err());
        assert!(parse_embeddings_str("7::NaN\n", "embeddings.dat").is_err());
    }

    #[test]
    fn test_parse_ratings_accepts_optional_timestamp() {
        let content = "1::10::5::978300760\n2::10::3.0\n";
        let ratings = parse_ratings_str(content, "ratings.dat").unwrap();
        assert_eq!(ratings, vec![Rating::new(1, 10, 5), Rating::new(2, 10, 3)]);
    }

    #[test]
    fn test_parse_rating_value() {
        assert_eq!(parse_rating_value("1"), Some(1));
        assert_eq!(parse_rating_value("5.0"), Some(5));
        assert_eq!(parse_rating_value("0"), None);
        assert_eq!(parse_rating_value("6"), None);
        assert_eq!(parse_rating_value("3.5"), None);
        assert_eq!(parse_rating_value("-2"), None);
    }

    #[test]
    fn test_missing_file() {
        let err = parse_movies(Path::new("/definitely/not/here/movies.dat")).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }
}

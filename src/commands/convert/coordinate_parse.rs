use super::*;

/// Normalizes a raw coordinate token into a validated (longitude, latitude)
/// pair. KML order is longitude first; a trailing altitude field is ignored.
pub fn parse_coordinates(token: &str) -> Result<(f64, f64)> {
    let fields = token
        .trim()
        .split(|character: char| character == ',' || character.is_whitespace())
        .filter(|field| !field.is_empty())
        .collect::<Vec<&str>>();

    if fields.len() < 2 {
        bail!("expected longitude,latitude in coordinate token {token:?}");
    }

    let longitude = fields[0]
        .parse::<f64>()
        .with_context(|| format!("bad longitude in coordinate token {token:?}"))?;
    let latitude = fields[1]
        .parse::<f64>()
        .with_context(|| format!("bad latitude in coordinate token {token:?}"))?;

    if !(-180.0..=180.0).contains(&longitude) {
        bail!("longitude {longitude} out of range in coordinate token {token:?}");
    }
    if !(-90.0..=90.0).contains(&latitude) {
        bail!("latitude {latitude} out of range in coordinate token {token:?}");
    }

    Ok((longitude, latitude))
}

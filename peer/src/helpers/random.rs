use ring::{
    error::Unspecified,
    rand::{SecureRandom, SystemRandom},
};

pub fn random_u32() -> Result<u32, Unspecified> {
    let mut bytes = [0u8; 4];
    SystemRandom::new().fill(&mut bytes)?;
    Ok(u32::from_be_bytes(bytes))
}

/// A uniformly distributed value in `[0, 1)`.
pub fn random_fraction() -> Result<f64, Unspecified> {
    Ok(f64::from(random_u32()?) / (f64::from(u32::MAX) + 1.0))
}

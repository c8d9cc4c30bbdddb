// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Token symbols and assets

use core::{fmt, str::FromStr};

use encdec::{DecodeOwned, Encode};

use crate::{
    helpers::{Reader, Writer},
    Error, Name,
};

/// Maximum symbol code length
pub const SYMBOL_CODE_MAX_LEN: usize = 7;

/// Maximum supported asset precision
pub const MAX_PRECISION: u8 = 18;

/// Symbol code, up to seven upper case ASCII characters packed
/// into a u64 with the first character in the low byte
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct SymbolCode(u64);

impl SymbolCode {
    pub const fn from_raw(v: u64) -> Self {
        Self(v)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in self.0.to_le_bytes() {
            if b == 0 {
                break;
            }
            write!(f, "{}", b as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymbolCode({self})")
    }
}

impl FromStr for SymbolCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > SYMBOL_CODE_MAX_LEN {
            return Err(Error::invalid("symbol_code", "length must be 1..7"));
        }

        if !s.bytes().all(|c| c.is_ascii_uppercase()) {
            return Err(Error::invalid("symbol_code", "expected upper case A-Z"));
        }

        let mut b = [0u8; 8];
        b[..s.len()].copy_from_slice(s.as_bytes());

        Ok(Self(u64::from_le_bytes(b)))
    }
}

impl Encode for SymbolCode {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(8)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.u64(self.0)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for SymbolCode {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);
        let v = r.u64("symbol_code")?;
        Ok((Self(v), r.offset()))
    }
}

/// Token symbol, precision in the low byte followed by the symbol code
///
/// ## Encoding:
/// ```text
///  0               1               2
///  0 1 2 3 4 5 6 7 0 1 2 3 4 5 6 7 0 ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   PRECISION   |   CODE (7 bytes, zero padded) |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Symbol(u64);

impl Symbol {
    /// Create a symbol from precision and code
    pub const fn new(precision: u8, code: SymbolCode) -> Self {
        Self((code.0 << 8) | precision as u64)
    }

    pub const fn from_raw(v: u64) -> Self {
        Self(v)
    }

    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// Number of decimal places
    pub const fn precision(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    pub const fn code(&self) -> SymbolCode {
        SymbolCode(self.0 >> 8)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision(), self.code())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({self})")
    }
}

impl FromStr for Symbol {
    type Err = Error;

    /// Parse a symbol in `PRECISION,CODE` format
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (p, c) = s
            .split_once(',')
            .ok_or_else(|| Error::invalid("symbol", "expected 'precision,CODE'"))?;

        let precision = p
            .trim()
            .parse::<u8>()
            .map_err(|e| Error::invalid("symbol", e))?;

        if precision > MAX_PRECISION {
            return Err(Error::invalid("symbol", "precision out of range"));
        }

        Ok(Self::new(precision, SymbolCode::from_str(c.trim())?))
    }
}

impl Encode for Symbol {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(8)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.u64(self.0)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for Symbol {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);
        let s = Self(r.u64("symbol")?);

        if s.precision() > MAX_PRECISION {
            return Err(Error::invalid("symbol", "precision out of range"));
        }

        Ok((s, r.offset()))
    }
}

/// Token quantity with symbol
#[derive(Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub const fn new(amount: i64, symbol: Symbol) -> Self {
        Self { amount, symbol }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.symbol.precision() as usize;
        let sign = if self.amount < 0 { "-" } else { "" };
        let a = self.amount.unsigned_abs();

        if p == 0 {
            return write!(f, "{sign}{a} {}", self.symbol.code());
        }

        // At least one integer digit
        let digits = format!("{a:0>width$}", width = p + 1);
        let (int, frac) = digits.split_at(digits.len() - p);

        write!(f, "{sign}{int}.{frac} {}", self.symbol.code())
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset({self})")
    }
}

impl FromStr for Asset {
    type Err = Error;

    /// Parse an asset in `AMOUNT CODE` format, precision is the
    /// number of fractional digits in the amount
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (amount, code) = s
            .trim()
            .split_once(' ')
            .ok_or_else(|| Error::invalid("asset", "expected 'amount CODE'"))?;

        let code = SymbolCode::from_str(code.trim())?;

        let (negative, amount) = match amount.strip_prefix('-') {
            Some(a) => (true, a),
            None => (false, amount),
        };

        let (int, frac) = amount.split_once('.').unwrap_or((amount, ""));
        if int.is_empty() || !int.bytes().chain(frac.bytes()).all(|c| c.is_ascii_digit()) {
            return Err(Error::invalid("asset", "invalid amount"));
        }
        if amount.ends_with('.') {
            return Err(Error::invalid("asset", "missing fractional digits"));
        }

        let precision = frac.len();
        if precision > MAX_PRECISION as usize {
            return Err(Error::invalid("asset", "precision out of range"));
        }

        let digits = format!("{int}{frac}");
        let v = digits
            .parse::<i64>()
            .map_err(|_| Error::invalid("asset", "amount out of range"))?;

        Ok(Self {
            amount: if negative { -v } else { v },
            symbol: Symbol::new(precision as u8, code),
        })
    }
}

impl Encode for Asset {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(16)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.i64(self.amount)?;
        w.write(&self.symbol)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for Asset {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);

        let amount = r.i64("asset")?;
        let symbol = r.read::<Symbol>("asset")?;

        Ok((Self { amount, symbol }, r.offset()))
    }
}

/// Asset with issuing contract
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct ExtendedAsset {
    pub quantity: Asset,
    pub contract: Name,
}

impl Encode for ExtendedAsset {
    type Error = Error;

    fn encode_len(&self) -> Result<usize, Error> {
        Ok(24)
    }

    fn encode(&self, buff: &mut [u8]) -> Result<usize, Error> {
        let mut w = Writer::new(buff);
        w.write(&self.quantity)?;
        w.write(&self.contract)?;
        Ok(w.offset())
    }
}

impl DecodeOwned for ExtendedAsset {
    type Output = Self;

    type Error = Error;

    fn decode_owned(buff: &[u8]) -> Result<(Self::Output, usize), Error> {
        let mut r = Reader::new(buff);

        let quantity = r.read::<Asset>("extended_asset")?;
        let contract = r.read::<Name>("extended_asset")?;

        Ok((Self { quantity, contract }, r.offset()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test::encode_decode;

    #[test]
    fn asset_format() {
        let tests = &[
            ("1.0000 EOS", 10_000, 4),
            ("0.0001 EOS", 1, 4),
            ("-12.50 USD", -1250, 2),
            ("42 NFT", 42, 0),
            ("0.00000001 BTC", 1, 8),
            ("92233720368.54775807 MAX", i64::MAX, 8),
        ];

        for (s, amount, precision) in tests {
            let a = Asset::from_str(s).unwrap();
            assert_eq!(a.amount, *amount, "amount for '{s}'");
            assert_eq!(a.symbol.precision(), *precision, "precision for '{s}'");
            assert_eq!(&a.to_string(), s);

            encode_decode(&a);
        }
    }

    #[test]
    fn asset_encoding() {
        let a = Asset::from_str("1.0000 EOS").unwrap();
        let b = encode_decode(&a);
        assert_eq!(hex::encode(b), "102700000000000004454f5300000000");
    }

    #[test]
    fn asset_invalid() {
        for s in ["1.0000", "1.0000 eos", "1. EOS", "abc EOS", "1.0000 TOOLONGX", ".5 EOS"] {
            assert!(Asset::from_str(s).is_err(), "expected error for '{s}'");
        }
    }

    #[test]
    fn asset_precision_limits() {
        let eos = SymbolCode::from_str("EOS").unwrap();

        // Beyond the supported range, still printable
        let a = Asset::new(1, Symbol::new(20, eos));
        assert_eq!(a.to_string(), "0.00000000000000000001 EOS");

        let a = Asset::new(i64::MIN, Symbol::new(255, eos));
        assert!(a.to_string().starts_with("-0.000"));

        // But not decodable
        let mut b = Symbol::new(MAX_PRECISION, eos).raw().to_le_bytes();
        assert!(Symbol::decode_owned(&b).is_ok());

        b[0] = MAX_PRECISION + 1;
        assert_eq!(
            Symbol::decode_owned(&b),
            Err(Error::invalid("symbol", "precision out of range"))
        );
    }

    #[test]
    fn symbol_format() {
        let s = Symbol::from_str("4,EOS").unwrap();
        assert_eq!(s.precision(), 4);
        assert_eq!(s.code().to_string(), "EOS");
        assert_eq!(s.to_string(), "4,EOS");
        assert_eq!(s.raw(), 0x534f4504);

        encode_decode(&s);
        encode_decode(&s.code());
    }

    #[test]
    fn extended_asset_encoding() {
        let a = ExtendedAsset {
            quantity: Asset::from_str("0.5000 EOS").unwrap(),
            contract: Name::new("eosio.token"),
        };
        let b = encode_decode(&a);
        assert_eq!(b.len(), 24);
    }
}

//! # Spectral response functions
//!
//! A spectral response function (SRF) weights the spectral dimension. Three
//! variants are supported:
//!
//! * [`DeltaSrf`]: a set of discrete wavelengths (Dirac combs).
//! * [`UniformSrf`]: a constant value over a closed interval, zero elsewhere.
//! * [`BandSrf`]: a tabulated response, linearly interpolated, zero outside the
//!   tabulated range.
//!
//! SRFs are used to narrow a spectral grid down to the region where the
//! response is nonzero, see [`crate::spectral::grid::SpectralGrid::select`].
//!
//! All wavelengths are in nm.

use log::warn;

use crate::ckdkit_errors::CkdkitError;
use crate::constants::Nanometer;

/// Linear interpolation of `(xs, ys)` at `x`, `0` outside `[xs[0], xs[n-1]]`.
///
/// `xs` must be strictly increasing.
pub(crate) fn interp_zero_outside(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if n == 0 || x < xs[0] || x > xs[n - 1] || x.is_nan() {
        return 0.0;
    }
    // First index with xs[i] > x
    let i = xs.partition_point(|v| *v <= x);
    if i == n {
        return ys[n - 1];
    }
    if i == 0 {
        return ys[0];
    }
    let (x0, x1) = (xs[i - 1], xs[i]);
    let (y0, y1) = (ys[i - 1], ys[i]);
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// A set of discrete wavelengths.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaSrf {
    wavelengths: Vec<Nanometer>,
}

impl DeltaSrf {
    /// Sorted, deduplicated, strictly positive wavelengths.
    pub fn new(wavelengths: &[Nanometer]) -> Result<Self, CkdkitError> {
        if wavelengths.is_empty() {
            return Err(CkdkitError::InvalidArgument(
                "delta SRF requires at least one wavelength".into(),
            ));
        }
        if let Some(w) = wavelengths.iter().find(|w| !(w.is_finite() && **w > 0.0)) {
            return Err(CkdkitError::InvalidArgument(format!(
                "delta SRF wavelengths must be strictly positive, got {w}"
            )));
        }
        let mut wavelengths = wavelengths.to_vec();
        wavelengths.sort_by(f64::total_cmp);
        wavelengths.dedup();
        Ok(DeltaSrf { wavelengths })
    }

    pub fn wavelengths(&self) -> &[Nanometer] {
        &self.wavelengths
    }
}

/// Constant response over `[wmin, wmax]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformSrf {
    wmin: Nanometer,
    wmax: Nanometer,
    value: f64,
}

impl UniformSrf {
    pub fn new(wmin: Nanometer, wmax: Nanometer, value: f64) -> Result<Self, CkdkitError> {
        if !(wmin >= 0.0 && wmin < wmax) {
            return Err(CkdkitError::InvalidArgument(format!(
                "uniform SRF requires 0 <= wmin < wmax, got [{wmin}, {wmax}]"
            )));
        }
        if !(value > 0.0) {
            return Err(CkdkitError::InvalidArgument(format!(
                "uniform SRF value must be strictly positive, got {value}"
            )));
        }
        Ok(UniformSrf { wmin, wmax, value })
    }

    pub fn wmin(&self) -> Nanometer {
        self.wmin
    }

    pub fn wmax(&self) -> Nanometer {
        self.wmax
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Default for UniformSrf {
    fn default() -> Self {
        UniformSrf {
            wmin: 300.0,
            wmax: 2500.0,
            value: 1.0,
        }
    }
}

/// Options of [`BandSrf::gaussian`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianOptions {
    /// Half-width of the truncated support, in standard deviations
    pub cutoff: f64,
    /// Sampling step (nm)
    pub resolution: Nanometer,
    /// Add a zero-valued node on each side of the support
    pub pad: bool,
    /// Scale the response so that it integrates to 1
    pub normalize: bool,
}

impl Default for GaussianOptions {
    fn default() -> Self {
        GaussianOptions {
            cutoff: 3.0,
            resolution: 1.0,
            pad: true,
            normalize: false,
        }
    }
}

/// Tabulated response, linearly interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct BandSrf {
    wavelengths: Vec<Nanometer>,
    values: Vec<f64>,
}

impl BandSrf {
    /// Arguments
    /// -----------------
    /// * `wavelengths`: at least two strictly increasing wavelengths (nm).
    /// * `values`: non-negative response values, one per wavelength.
    ///
    /// Return
    /// ----------
    /// * The band SRF. A warning is logged if the response does not start and
    ///   end with a zero, since selection then truncates the response abruptly.
    pub fn new(wavelengths: Vec<Nanometer>, values: Vec<f64>) -> Result<Self, CkdkitError> {
        if wavelengths.len() != values.len() {
            return Err(CkdkitError::InvalidArgument(format!(
                "band SRF has {} wavelengths but {} values",
                wavelengths.len(),
                values.len()
            )));
        }
        if wavelengths.len() < 2 {
            return Err(CkdkitError::InvalidArgument(
                "band SRF requires at least two points".into(),
            ));
        }
        if wavelengths.windows(2).any(|pair| !(pair[1] > pair[0])) {
            return Err(CkdkitError::InvalidArgument(
                "band SRF wavelengths must be strictly increasing".into(),
            ));
        }
        if values.iter().any(|v| !(*v >= 0.0)) {
            return Err(CkdkitError::InvalidArgument(
                "band SRF values must be non-negative".into(),
            ));
        }
        if values[0] != 0.0 || values[values.len() - 1] != 0.0 {
            warn!(
                "band SRF over [{}, {}] nm does not have leading and trailing zeros",
                wavelengths[0],
                wavelengths[wavelengths.len() - 1]
            );
        }
        Ok(BandSrf {
            wavelengths,
            values,
        })
    }

    /// Gaussian response centred on `center` with full width at half maximum `fwhm`.
    pub fn gaussian(
        center: Nanometer,
        fwhm: Nanometer,
        options: GaussianOptions,
    ) -> Result<Self, CkdkitError> {
        if !(fwhm > 0.0) || !(options.resolution > 0.0) || !(options.cutoff > 0.0) {
            return Err(CkdkitError::InvalidArgument(format!(
                "invalid Gaussian SRF parameters: fwhm = {fwhm}, resolution = {}, cutoff = {}",
                options.resolution, options.cutoff
            )));
        }
        let sigma = fwhm / (2.0 * (2.0 * std::f64::consts::LN_2).sqrt());
        let half_width = options.cutoff * sigma;
        let wmin = center - half_width;
        let n = (2.0 * half_width / options.resolution).ceil() as usize;

        let mut wavelengths: Vec<f64> = (0..=n)
            .map(|i| (wmin + i as f64 * options.resolution).min(center + half_width))
            .collect();
        wavelengths.dedup();
        let mut values: Vec<f64> = wavelengths
            .iter()
            .map(|w| (-0.5 * ((w - center) / sigma).powi(2)).exp())
            .collect();

        if options.pad {
            let first = wavelengths[0] - options.resolution;
            let last = wavelengths[wavelengths.len() - 1] + options.resolution;
            wavelengths.insert(0, first);
            values.insert(0, 0.0);
            wavelengths.push(last);
            values.push(0.0);
        }
        if wavelengths[0] <= 0.0 {
            return Err(CkdkitError::InvalidArgument(format!(
                "Gaussian SRF centred on {center} nm extends to non-positive wavelengths"
            )));
        }

        let mut srf = BandSrf {
            wavelengths,
            values,
        };
        if options.normalize {
            let (wmin, wmax) = (srf.wavelengths[0], srf.wavelengths[srf.wavelengths.len() - 1]);
            let integral = srf.integrate(wmin, wmax);
            srf.values.iter_mut().for_each(|v| *v /= integral);
        }
        Ok(srf)
    }

    pub fn wavelengths(&self) -> &[Nanometer] {
        &self.wavelengths
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn eval(&self, w: Nanometer) -> f64 {
        interp_zero_outside(&self.wavelengths, &self.values, w)
    }

    /// Trapezoidal integral of the response over `[wmin, wmax]`.
    pub fn integrate(&self, wmin: Nanometer, wmax: Nanometer) -> f64 {
        let cumulative = self.cumulative_at(&[wmin, wmax]);
        cumulative[1] - cumulative[0]
    }

    /// Trapezoidal integrals over each interval `[w[i], w[i+1]]` of `w`.
    ///
    /// The response is sampled on the union of `w` and the tabulated
    /// wavelengths so that no feature is missed. The result has `w.len() - 1`
    /// entries and is cumulated: entry `i` is the integral over `[w[0], w[i+1]]`.
    pub fn integrate_cumulative(&self, w: &[Nanometer]) -> Vec<f64> {
        let cumulative = self.cumulative_at(w);
        let origin = cumulative.first().copied().unwrap_or(0.0);
        cumulative.into_iter().skip(1).map(|v| v - origin).collect()
    }

    /// Cumulative integral from -∞ to each `w`; same length as `w`.
    pub(crate) fn cumulative_at(&self, w: &[Nanometer]) -> Vec<f64> {
        w.iter().map(|x| self.primitive(*x)).collect()
    }

    /// ∫_{-∞}^{x} srf(w) dw on the piecewise-linear response.
    fn primitive(&self, x: Nanometer) -> f64 {
        let xs = &self.wavelengths;
        let ys = &self.values;
        let mut total = 0.0;
        for i in 0..xs.len() - 1 {
            let (x0, x1) = (xs[i], xs[i + 1]);
            if x <= x0 {
                break;
            }
            let upper = x.min(x1);
            let y_upper = ys[i] + (ys[i + 1] - ys[i]) * (upper - x0) / (x1 - x0);
            total += 0.5 * (ys[i] + y_upper) * (upper - x0);
        }
        total
    }
}

/// A spectral response function.
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralResponse {
    Delta(DeltaSrf),
    Uniform(UniformSrf),
    Band(BandSrf),
}

impl SpectralResponse {
    pub fn delta(wavelengths: &[Nanometer]) -> Result<Self, CkdkitError> {
        Ok(SpectralResponse::Delta(DeltaSrf::new(wavelengths)?))
    }

    pub fn uniform(wmin: Nanometer, wmax: Nanometer, value: f64) -> Result<Self, CkdkitError> {
        Ok(SpectralResponse::Uniform(UniformSrf::new(wmin, wmax, value)?))
    }

    pub fn band(wavelengths: Vec<Nanometer>, values: Vec<f64>) -> Result<Self, CkdkitError> {
        Ok(SpectralResponse::Band(BandSrf::new(wavelengths, values)?))
    }

    /// Evaluate the response at each wavelength. Delta responses evaluate to 0
    /// everywhere since they are not functions.
    pub fn eval(&self, w: &[Nanometer]) -> Vec<f64> {
        match self {
            SpectralResponse::Delta(_) => vec![0.0; w.len()],
            SpectralResponse::Uniform(srf) => w
                .iter()
                .map(|x| {
                    if *x >= srf.wmin && *x <= srf.wmax {
                        srf.value
                    } else {
                        0.0
                    }
                })
                .collect(),
            SpectralResponse::Band(srf) => w.iter().map(|x| srf.eval(*x)).collect(),
        }
    }

    /// Interval outside of which the response vanishes.
    pub fn support(&self) -> (Nanometer, Nanometer) {
        match self {
            SpectralResponse::Delta(srf) => (
                srf.wavelengths[0],
                srf.wavelengths[srf.wavelengths.len() - 1],
            ),
            SpectralResponse::Uniform(srf) => (srf.wmin, srf.wmax),
            SpectralResponse::Band(srf) => {
                // Trim leading and trailing zeros down to the last zero node
                let first = srf.values.iter().position(|v| *v > 0.0).unwrap_or(0);
                let last = srf
                    .values
                    .iter()
                    .rposition(|v| *v > 0.0)
                    .unwrap_or(srf.values.len() - 1);
                let lo = first.saturating_sub(1);
                let hi = (last + 1).min(srf.values.len() - 1);
                (srf.wavelengths[lo], srf.wavelengths[hi])
            }
        }
    }
}

impl Default for SpectralResponse {
    fn default() -> Self {
        SpectralResponse::Uniform(UniformSrf::default())
    }
}

#[cfg(test)]
mod test_response {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_uniform() {
        let srf = SpectralResponse::uniform(400.0, 500.0, 1.0).unwrap();
        assert_eq!(
            srf.eval(&[300.0, 400.0, 450.0, 500.0, 600.0]),
            vec![0.0, 1.0, 1.0, 1.0, 0.0]
        );
        assert_eq!(srf.support(), (400.0, 500.0));
        assert!(SpectralResponse::uniform(500.0, 400.0, 1.0).is_err());
        assert!(SpectralResponse::uniform(400.0, 500.0, 0.0).is_err());
    }

    #[test]
    fn test_delta() {
        let srf = SpectralResponse::delta(&[550.0, 440.0, 550.0]).unwrap();
        match &srf {
            SpectralResponse::Delta(delta) => assert_eq!(delta.wavelengths(), &[440.0, 550.0]),
            _ => panic!("expected a delta SRF"),
        }
        assert_eq!(srf.eval(&[440.0, 550.0]), vec![0.0, 0.0]);
        assert_eq!(srf.support(), (440.0, 550.0));
        assert!(SpectralResponse::delta(&[-1.0]).is_err());
        assert!(SpectralResponse::delta(&[]).is_err());
    }

    #[test]
    fn test_band_eval() {
        let srf = BandSrf::new(vec![500.0, 550.0, 600.0], vec![0.0, 1.0, 0.0]).unwrap();
        assert_eq!(srf.eval(450.0), 0.0);
        assert_eq!(srf.eval(500.0), 0.0);
        assert_relative_eq!(srf.eval(525.0), 0.5);
        assert_relative_eq!(srf.eval(550.0), 1.0);
        assert_eq!(srf.eval(650.0), 0.0);
    }

    #[test]
    fn test_band_validation() {
        assert!(BandSrf::new(vec![500.0], vec![1.0]).is_err());
        assert!(BandSrf::new(vec![500.0, 500.0], vec![0.0, 0.0]).is_err());
        assert!(BandSrf::new(vec![500.0, 600.0], vec![0.0]).is_err());
        assert!(BandSrf::new(vec![500.0, 600.0], vec![0.0, -1.0]).is_err());
    }

    #[test]
    fn test_band_integrate() {
        let srf = BandSrf::new(vec![500.0, 550.0, 600.0], vec![0.0, 1.0, 0.0]).unwrap();
        assert_relative_eq!(srf.integrate(500.0, 600.0), 50.0, epsilon = 1e-12);
        assert_relative_eq!(srf.integrate(400.0, 700.0), 50.0, epsilon = 1e-12);
        assert_relative_eq!(srf.integrate(500.0, 550.0), 25.0, epsilon = 1e-12);
        assert_relative_eq!(srf.integrate(525.0, 575.0), 37.5, epsilon = 1e-12);
    }

    #[test]
    fn test_band_integrate_cumulative() {
        let srf = BandSrf::new(vec![500.0, 550.0, 600.0], vec![0.0, 1.0, 0.0]).unwrap();
        let cumulative = srf.integrate_cumulative(&[450.0, 500.0, 550.0, 600.0, 650.0]);
        assert_eq!(cumulative.len(), 4);
        let expected = [0.0, 25.0, 50.0, 50.0];
        for (c, e) in cumulative.iter().zip(expected) {
            assert_relative_eq!(*c, e, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_band_support() {
        let srf = SpectralResponse::band(
            vec![400.0, 450.0, 500.0, 550.0, 600.0, 650.0],
            vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0],
        )
        .unwrap();
        assert_eq!(srf.support(), (450.0, 600.0));
    }

    #[test]
    fn test_gaussian() {
        let srf = BandSrf::gaussian(
            550.0,
            40.0,
            GaussianOptions {
                normalize: true,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(srf.values()[0], 0.0);
        assert_eq!(srf.values()[srf.values().len() - 1], 0.0);
        let (wmin, wmax) = (srf.wavelengths()[0], srf.wavelengths()[srf.wavelengths().len() - 1]);
        assert_relative_eq!(srf.integrate(wmin, wmax), 1.0, epsilon = 1e-12);
        assert!(srf.eval(550.0) > srf.eval(540.0));
        assert_relative_eq!(srf.eval(530.0), srf.eval(570.0), epsilon = 1e-3);
    }
}

//! # Low-Precision Analytic Ephemeris
//!
//! Moon and Sun positions from the truncated ELP-2000/82 series and the
//! low-precision solar theory tabulated in Meeus, *Astronomical Algorithms*
//! (2nd ed., chapters 22, 25, 40, 47, 48).
//!
//! Accuracy is roughly 10" in lunar longitude, 4" in latitude and a few km in
//! distance, which puts rise/set/transit times within a minute and quarter
//! phases within a couple of minutes. Plenty for a display, nowhere near good
//! enough for occultation work.
//!
//! ## Searches
//! All three event searches share one strategy: coarse scan of a signed
//! function, then bisection once a genuine rising zero is bracketed.
//! - Rise/set: upper-limb topocentric altitude plus standard refraction
//! - Transit: local hour angle wrapped to (-180, 180]
//! - Quarters: Moon−Sun elongation minus the quarter's target angle

use super::{
    ensure_finite, AstroTime, Direction, Ephemeris, EphemerisError, Equatorial, GeoVector,
    Horizontal, MoonQuarter, Observer, Quarter, KM_PER_AU,
};

const DAYS_PER_CENTURY: f64 = 36_525.0;

const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6_378.14;
/// Polar to equatorial axis ratio b/a.
const EARTH_AXIS_RATIO: f64 = 0.996_647_19;
const MOON_RADIUS_KM: f64 = 1_737.4;

/// Standard atmospheric refraction at the horizon, degrees.
const HORIZON_REFRACTION_DEG: f64 = 34.0 / 60.0;

const MAX_BISECTIONS: usize = 60;
/// Searches stop refining below one second.
const CONVERGENCE_DAYS: f64 = 1.0 / 86_400.0;

const TRANSIT_STEP_DAYS: f64 = 10.0 / 1_440.0;
const QUARTER_SCAN_DAYS: f64 = 10.0;
const QUARTER_STEP_DAYS: f64 = 1.0;
/// Offset past a found quarter before looking for the next one.
const QUARTER_CHAIN_OFFSET_DAYS: f64 = 6.0;

/// Periodic terms for longitude and distance: D, M, M', F, Σl (1e-6 deg), Σr (1e-3 km).
#[rustfmt::skip]
const LONGITUDE_DISTANCE_TERMS: [(i8, i8, i8, i8, f64, f64); 60] = [
    (0, 0, 1, 0, 6_288_774.0, -20_905_355.0),
    (2, 0, -1, 0, 1_274_027.0, -3_699_111.0),
    (2, 0, 0, 0, 658_314.0, -2_955_968.0),
    (0, 0, 2, 0, 213_618.0, -569_925.0),
    (0, 1, 0, 0, -185_116.0, 48_888.0),
    (0, 0, 0, 2, -114_332.0, -3_149.0),
    (2, 0, -2, 0, 58_793.0, 246_158.0),
    (2, -1, -1, 0, 57_066.0, -152_138.0),
    (2, 0, 1, 0, 53_322.0, -170_733.0),
    (2, -1, 0, 0, 45_758.0, -204_586.0),
    (0, 1, -1, 0, -40_923.0, -129_620.0),
    (1, 0, 0, 0, -34_720.0, 108_743.0),
    (0, 1, 1, 0, -30_383.0, 104_755.0),
    (2, 0, 0, -2, 15_327.0, 10_321.0),
    (0, 0, 1, 2, -12_528.0, 0.0),
    (0, 0, 1, -2, 10_980.0, 79_661.0),
    (4, 0, -1, 0, 10_675.0, -34_782.0),
    (0, 0, 3, 0, 10_034.0, -23_210.0),
    (4, 0, -2, 0, 8_548.0, -21_636.0),
    (2, 1, -1, 0, -7_888.0, 24_208.0),
    (2, 1, 0, 0, -6_766.0, 30_824.0),
    (1, 0, -1, 0, -5_163.0, -8_379.0),
    (1, 1, 0, 0, 4_987.0, -16_675.0),
    (2, -1, 1, 0, 4_036.0, -12_831.0),
    (2, 0, 2, 0, 3_994.0, -10_445.0),
    (4, 0, 0, 0, 3_861.0, -11_650.0),
    (2, 0, -3, 0, 3_665.0, 14_403.0),
    (0, 1, -2, 0, -2_689.0, -7_003.0),
    (2, 0, -1, 2, -2_602.0, 0.0),
    (2, -1, -2, 0, 2_390.0, 10_056.0),
    (1, 0, 1, 0, -2_348.0, 6_322.0),
    (2, -2, 0, 0, 2_236.0, -9_884.0),
    (0, 1, 2, 0, -2_120.0, 5_751.0),
    (0, 2, 0, 0, -2_069.0, 0.0),
    (2, -2, -1, 0, 2_048.0, -4_950.0),
    (2, 0, 1, -2, -1_773.0, 4_130.0),
    (2, 0, 0, 2, -1_595.0, 0.0),
    (4, -1, -1, 0, 1_215.0, -3_958.0),
    (0, 0, 2, 2, -1_110.0, 0.0),
    (3, 0, -1, 0, -892.0, 3_258.0),
    (2, 1, 1, 0, -810.0, 2_616.0),
    (4, -1, -2, 0, 759.0, -1_897.0),
    (0, 2, -1, 0, -713.0, -2_117.0),
    (2, 2, -1, 0, -700.0, 2_354.0),
    (2, 1, -2, 0, 691.0, 0.0),
    (2, -1, 0, -2, 596.0, 0.0),
    (4, 0, 1, 0, 549.0, -1_423.0),
    (0, 0, 4, 0, 537.0, -1_117.0),
    (4, -1, 0, 0, 520.0, -1_571.0),
    (1, 0, -2, 0, -487.0, -1_739.0),
    (2, 1, 0, -2, -399.0, 0.0),
    (0, 0, 2, -2, -381.0, -4_421.0),
    (1, 1, 1, 0, 351.0, 0.0),
    (3, 0, -2, 0, -340.0, 0.0),
    (4, 0, -3, 0, 330.0, 0.0),
    (2, -1, 2, 0, 327.0, 0.0),
    (0, 2, 1, 0, -323.0, 1_165.0),
    (1, 1, -1, 0, 299.0, 0.0),
    (2, 0, 3, 0, 294.0, 0.0),
    (2, 0, -1, -2, 0.0, 8_752.0),
];

/// Periodic terms for latitude: D, M, M', F, Σb (1e-6 deg). Truncated below 800.
#[rustfmt::skip]
const LATITUDE_TERMS: [(i8, i8, i8, i8, f64); 30] = [
    (0, 0, 0, 1, 5_128_122.0),
    (0, 0, 1, 1, 280_602.0),
    (0, 0, 1, -1, 277_693.0),
    (2, 0, 0, -1, 173_237.0),
    (2, 0, -1, 1, 55_413.0),
    (2, 0, -1, -1, 46_271.0),
    (2, 0, 0, 1, 32_573.0),
    (0, 0, 2, 1, 17_198.0),
    (2, 0, 1, -1, 9_266.0),
    (0, 0, 2, -1, 8_822.0),
    (2, -1, 0, -1, 8_216.0),
    (2, 0, -2, -1, 4_324.0),
    (2, 0, 1, 1, 4_200.0),
    (2, 1, 0, -1, -3_359.0),
    (2, -1, -1, 1, 2_463.0),
    (2, -1, 0, 1, 2_211.0),
    (2, -1, -1, -1, 2_065.0),
    (0, 1, -1, -1, -1_870.0),
    (4, 0, -1, -1, 1_828.0),
    (0, 1, 0, 1, -1_794.0),
    (0, 0, 0, 3, -1_749.0),
    (0, 1, -1, 1, -1_565.0),
    (1, 0, 0, 1, -1_491.0),
    (0, 1, 1, 1, -1_475.0),
    (0, 1, 1, -1, -1_410.0),
    (0, 1, 0, -1, -1_344.0),
    (1, 0, 0, -1, -1_335.0),
    (0, 0, 3, 1, 1_107.0),
    (4, 0, 0, -1, 1_021.0),
    (4, 0, -1, 1, 833.0),
];

/// Normalize an angle to [0, 360).
pub(crate) fn normalize_degrees(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid can round a tiny negative input up to exactly 360
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Normalize an angle to (-180, 180].
pub(crate) fn normalize_to_pm180(deg: f64) -> f64 {
    let d = normalize_degrees(deg);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Nutation in longitude and obliquity, degrees (0.5" series).
#[derive(Clone, Copy, Debug)]
struct Nutation {
    longitude: f64,
    obliquity: f64,
}

fn nutation(t: f64) -> Nutation {
    let omega = (125.044_52 - 1_934.136_261 * t).to_radians();
    let sun = (280.4665 + 36_000.7698 * t).to_radians();
    let moon = (218.3165 + 481_267.8813 * t).to_radians();
    let dpsi = -17.20 * omega.sin() - 1.32 * (2.0 * sun).sin() - 0.23 * (2.0 * moon).sin()
        + 0.21 * (2.0 * omega).sin();
    let deps = 9.20 * omega.cos() + 0.57 * (2.0 * sun).cos() + 0.10 * (2.0 * moon).cos()
        - 0.09 * (2.0 * omega).cos();
    Nutation {
        longitude: dpsi / 3_600.0,
        obliquity: deps / 3_600.0,
    }
}

/// IAU mean obliquity of the ecliptic, degrees.
fn mean_obliquity(t: f64) -> f64 {
    23.439_291_111 - 0.013_004_166_7 * t - 1.639e-7 * t * t + 5.036e-7 * t * t * t
}

#[derive(Clone, Copy, Debug)]
struct EclipticPoint {
    lon: f64,
    lat: f64,
    dist_km: f64,
}

/// Apparent geocentric ecliptic position of the Moon (equinox of date).
fn moon_ecliptic(t: f64, nutation: &Nutation) -> EclipticPoint {
    let t2 = t * t;
    let t3 = t2 * t;
    let t4 = t3 * t;

    let lp = 218.316_447_7 + 481_267.881_234_21 * t - 0.001_578_6 * t2 + t3 / 538_841.0
        - t4 / 65_194_000.0;
    let d = 297.850_192_1 + 445_267.111_403_4 * t - 0.001_881_9 * t2 + t3 / 545_868.0
        - t4 / 113_065_000.0;
    let m = 357.529_109_2 + 35_999.050_290_9 * t - 0.000_153_6 * t2 + t3 / 24_490_000.0;
    let mp = 134.963_396_4 + 477_198.867_505_5 * t + 0.008_741_4 * t2 + t3 / 69_699.0
        - t4 / 14_712_000.0;
    let f = 93.272_095_0 + 483_202.017_523_3 * t - 0.003_653_9 * t2 - t3 / 3_526_000.0
        + t4 / 863_310_000.0;

    let a1 = normalize_degrees(119.75 + 131.849 * t).to_radians();
    let a2 = normalize_degrees(53.09 + 479_264.290 * t).to_radians();
    let a3 = normalize_degrees(313.45 + 481_266.484 * t).to_radians();
    let e = 1.0 - 0.002_516 * t - 0.000_007_4 * t2;

    let lp = normalize_degrees(lp);
    let (d, m, mp, f) = (
        normalize_degrees(d).to_radians(),
        normalize_degrees(m).to_radians(),
        normalize_degrees(mp).to_radians(),
        normalize_degrees(f).to_radians(),
    );

    let eccentricity = |m_mult: i8| match m_mult.abs() {
        1 => e,
        2 => e * e,
        _ => 1.0,
    };

    let mut sum_l = 0.0;
    let mut sum_r = 0.0;
    for &(cd, cm, cmp, cf, coeff_l, coeff_r) in LONGITUDE_DISTANCE_TERMS.iter() {
        let arg = f64::from(cd) * d + f64::from(cm) * m + f64::from(cmp) * mp + f64::from(cf) * f;
        let ecc = eccentricity(cm);
        sum_l += coeff_l * ecc * arg.sin();
        sum_r += coeff_r * ecc * arg.cos();
    }

    let mut sum_b = 0.0;
    for &(cd, cm, cmp, cf, coeff_b) in LATITUDE_TERMS.iter() {
        let arg = f64::from(cd) * d + f64::from(cm) * m + f64::from(cmp) * mp + f64::from(cf) * f;
        sum_b += coeff_b * eccentricity(cm) * arg.sin();
    }

    let lp_rad = lp.to_radians();
    sum_l += 3_958.0 * a1.sin() + 1_962.0 * (lp_rad - f).sin() + 318.0 * a2.sin();
    sum_b += -2_235.0 * lp_rad.sin() + 382.0 * a3.sin() + 175.0 * (a1 - f).sin()
        + 175.0 * (a1 + f).sin()
        + 127.0 * (lp_rad - mp).sin()
        - 115.0 * (lp_rad + mp).sin();

    EclipticPoint {
        lon: normalize_degrees(lp + sum_l / 1_000_000.0 + nutation.longitude),
        lat: sum_b / 1_000_000.0,
        dist_km: 385_000.56 + sum_r / 1_000.0,
    }
}

/// Apparent geocentric ecliptic position of the Sun (equinox of date).
fn sun_ecliptic(t: f64, nutation: &Nutation) -> EclipticPoint {
    let t2 = t * t;
    let l0 = 280.466_46 + 36_000.769_83 * t + 0.000_303_2 * t2;
    let m = normalize_degrees(357.529_11 + 35_999.050_29 * t - 0.000_153_7 * t2).to_radians();
    let e = 0.016_708_634 - 0.000_042_037 * t - 0.000_000_126_7 * t2;
    let c = (1.914_602 - 0.004_817 * t - 0.000_014 * t2) * m.sin()
        + (0.019_993 - 0.000_101 * t) * (2.0 * m).sin()
        + 0.000_289 * (3.0 * m).sin();
    let nu = m + c.to_radians();
    let r_au = 1.000_001_018 * (1.0 - e * e) / (1.0 + e * nu.cos());
    let aberration = -20.4898 / 3_600.0 / r_au;

    EclipticPoint {
        lon: normalize_degrees(l0 + c + nutation.longitude + aberration),
        lat: 0.0,
        dist_km: r_au * KM_PER_AU,
    }
}

/// Ecliptic to equatorial rotation. Returns (right ascension, declination) in degrees.
fn ecliptic_to_equatorial(lon: f64, lat: f64, obliquity: f64) -> (f64, f64) {
    let (lon, lat, eps) = (lon.to_radians(), lat.to_radians(), obliquity.to_radians());
    let ra = (lon.sin() * eps.cos() - lat.tan() * eps.sin()).atan2(lon.cos());
    let dec = (lat.sin() * eps.cos() + lat.cos() * eps.sin() * lon.sin()).asin();
    (normalize_degrees(ra.to_degrees()), dec.to_degrees())
}

/// Geocentric Moon state at one instant, everything of date.
#[derive(Clone, Copy, Debug)]
struct MoonSnapshot {
    ecliptic: EclipticPoint,
    ra: f64,
    dec: f64,
    /// Apparent Greenwich sidereal time, degrees
    gast: f64,
}

fn moon_snapshot(time: &AstroTime) -> MoonSnapshot {
    let t = time.tt() / DAYS_PER_CENTURY;
    let nut = nutation(t);
    let obliquity = mean_obliquity(t) + nut.obliquity;
    let ecliptic = moon_ecliptic(t, &nut);
    let (ra, dec) = ecliptic_to_equatorial(ecliptic.lon, ecliptic.lat, obliquity);
    MoonSnapshot {
        ecliptic,
        ra,
        dec,
        gast: apparent_sidereal_degrees(time, &nut, obliquity),
    }
}

/// Apparent Greenwich sidereal time in degrees (Meeus 12.4 plus equation of the equinoxes).
fn apparent_sidereal_degrees(time: &AstroTime, nutation: &Nutation, obliquity: f64) -> f64 {
    let d = time.ut();
    let t = d / DAYS_PER_CENTURY;
    let gmst = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    normalize_degrees(gmst + nutation.longitude * obliquity.to_radians().cos())
}

fn sidereal_at(time: &AstroTime) -> f64 {
    let t = time.tt() / DAYS_PER_CENTURY;
    let nut = nutation(t);
    apparent_sidereal_degrees(time, &nut, mean_obliquity(t) + nut.obliquity)
}

/// Topocentric Moon direction for an observer.
#[derive(Clone, Copy, Debug)]
struct Topocentric {
    ra: f64,
    dec: f64,
    dist_km: f64,
    /// Local apparent sidereal time, degrees
    lst: f64,
}

impl Topocentric {
    fn hour_angle(&self) -> f64 {
        normalize_to_pm180(self.lst - self.ra)
    }
}

/// Shift the geocentric Moon to the observer's position on the ellipsoid (Meeus ch. 11, 40).
fn topocentric(observer: &Observer, time: &AstroTime) -> Topocentric {
    let snap = moon_snapshot(time);
    let lst = normalize_degrees(snap.gast + observer.longitude);

    let phi = observer.latitude.to_radians();
    let u = (EARTH_AXIS_RATIO * phi.tan()).atan();
    let height_ratio = observer.height_m / (EARTH_EQUATORIAL_RADIUS_KM * 1_000.0);
    let rho_sin = EARTH_AXIS_RATIO * u.sin() + height_ratio * phi.sin();
    let rho_cos = u.cos() + height_ratio * phi.cos();

    let lst_rad = lst.to_radians();
    let (ra, dec) = (snap.ra.to_radians(), snap.dec.to_radians());
    let dist = snap.ecliptic.dist_km;

    let x = dist * dec.cos() * ra.cos() - EARTH_EQUATORIAL_RADIUS_KM * rho_cos * lst_rad.cos();
    let y = dist * dec.cos() * ra.sin() - EARTH_EQUATORIAL_RADIUS_KM * rho_cos * lst_rad.sin();
    let z = dist * dec.sin() - EARTH_EQUATORIAL_RADIUS_KM * rho_sin;
    let dist_km = (x * x + y * y + z * z).sqrt();

    Topocentric {
        ra: normalize_degrees(y.atan2(x).to_degrees()),
        dec: (z / dist_km).asin().to_degrees(),
        dist_km,
        lst,
    }
}

/// Unrefracted altitude and azimuth for a local hour angle and declination, degrees.
fn horizon_from_hour_angle(latitude: f64, hour_angle: f64, dec: f64) -> (f64, f64) {
    let (phi, h, dec) = (
        latitude.to_radians(),
        hour_angle.to_radians(),
        dec.to_radians(),
    );
    let north = phi.cos() * dec.sin() - phi.sin() * dec.cos() * h.cos();
    let east = -dec.cos() * h.sin();
    let up = phi.sin() * dec.sin() + phi.cos() * dec.cos() * h.cos();
    (
        normalize_degrees(east.atan2(north).to_degrees()),
        up.clamp(-1.0, 1.0).asin().to_degrees(),
    )
}

/// Saemundsson refraction for a true altitude, degrees.
fn refraction_degrees(altitude: f64) -> f64 {
    if !(-1.0..=90.0).contains(&altitude) {
        return 0.0;
    }
    let arg = (altitude + 10.3 / (altitude + 5.11)).to_radians();
    (1.02 / arg.tan() / 60.0).max(0.0)
}

/// Upper-limb altitude relative to the refracted horizon. Zero at rise and set.
fn limb_altitude(observer: &Observer, time: &AstroTime) -> f64 {
    let topo = topocentric(observer, time);
    let (_, altitude) = horizon_from_hour_angle(observer.latitude, topo.hour_angle(), topo.dec);
    let semidiameter = (MOON_RADIUS_KM / topo.dist_km).asin().to_degrees();
    altitude + semidiameter + HORIZON_REFRACTION_DEG
}

fn elongation(time: &AstroTime) -> f64 {
    let t = time.tt() / DAYS_PER_CENTURY;
    let nut = nutation(t);
    normalize_degrees(moon_ecliptic(t, &nut).lon - sun_ecliptic(t, &nut).lon)
}

/// A sign change from negative to non-negative that is not a ±180 wrap.
fn is_genuine_ascent(f_prev: f64, f_curr: f64) -> bool {
    f_prev < 0.0 && f_curr >= 0.0 && f_curr - f_prev < 180.0
}

/// Coarse scan then bisection for the first rising zero of `f` after `start`.
///
/// Returns `Ok(None)` when no ascent is bracketed inside `window_days`.
fn find_ascending_root<F>(
    what: &'static str,
    start: &AstroTime,
    window_days: f64,
    step_days: f64,
    mut f: F,
) -> Result<Option<AstroTime>, EphemerisError>
where
    F: FnMut(&AstroTime) -> f64,
{
    let window_days = ensure_finite("search window", window_days)?;
    let step_days = ensure_finite("search step", step_days)?;
    if window_days <= 0.0 || step_days <= 0.0 {
        return Ok(None);
    }

    let mut t_prev = *start;
    let mut f_prev = ensure_finite(what, f(&t_prev))?;
    let steps = (window_days / step_days).ceil() as usize;

    for step in 1..=steps {
        let t_curr = start.add_days((step as f64 * step_days).min(window_days))?;
        let f_curr = ensure_finite(what, f(&t_curr))?;

        if is_genuine_ascent(f_prev, f_curr) {
            let (mut lo, mut hi) = (t_prev.ut(), t_curr.ut());
            for _ in 0..MAX_BISECTIONS {
                if hi - lo < CONVERGENCE_DAYS {
                    return AstroTime::from_ut_days(0.5 * (lo + hi)).map(Some);
                }
                let mid = 0.5 * (lo + hi);
                let f_mid = ensure_finite(what, f(&AstroTime::from_ut_days(mid)?))?;
                if f_mid < 0.0 {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            return Err(EphemerisError::NoConvergence { what });
        }

        t_prev = t_curr;
        f_prev = f_curr;
    }

    Ok(None)
}

/// Analytic Moon/Sun ephemeris. Stateless and cheap to copy.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeeusEphemeris;

impl MeeusEphemeris {
    pub fn new() -> Self {
        MeeusEphemeris
    }
}

impl Ephemeris for MeeusEphemeris {
    fn geo_vector(&self, time: &AstroTime) -> Result<GeoVector, EphemerisError> {
        let snap = moon_snapshot(time);
        let (ra, dec) = (snap.ra.to_radians(), snap.dec.to_radians());
        let dist_au = snap.ecliptic.dist_km / KM_PER_AU;
        Ok(GeoVector {
            x: ensure_finite("moon vector x", dist_au * dec.cos() * ra.cos())?,
            y: ensure_finite("moon vector y", dist_au * dec.cos() * ra.sin())?,
            z: ensure_finite("moon vector z", dist_au * dec.sin())?,
        })
    }

    fn equator(&self, observer: &Observer, time: &AstroTime) -> Result<Equatorial, EphemerisError> {
        let topo = topocentric(observer, time);
        Ok(Equatorial {
            ra: ensure_finite("right ascension", topo.ra / 15.0)?,
            dec: ensure_finite("declination", topo.dec)?,
            dist: ensure_finite("topocentric distance", topo.dist_km / KM_PER_AU)?,
        })
    }

    fn ecliptic_longitude(&self, time: &AstroTime) -> Result<f64, EphemerisError> {
        ensure_finite("ecliptic longitude", moon_snapshot(time).ecliptic.lon)
    }

    fn horizon(
        &self,
        observer: &Observer,
        time: &AstroTime,
        ra: f64,
        dec: f64,
    ) -> Result<Horizontal, EphemerisError> {
        let lst = sidereal_at(time) + observer.longitude;
        let hour_angle = normalize_to_pm180(lst - ra * 15.0);
        let (azimuth, altitude) = horizon_from_hour_angle(observer.latitude, hour_angle, dec);
        Ok(Horizontal {
            azimuth: ensure_finite("azimuth", azimuth)?,
            altitude: ensure_finite("altitude", altitude + refraction_degrees(altitude))?,
        })
    }

    fn phase_angle(&self, time: &AstroTime) -> Result<f64, EphemerisError> {
        ensure_finite("phase angle", elongation(time))
    }

    fn illumination_fraction(&self, time: &AstroTime) -> Result<f64, EphemerisError> {
        let t = time.tt() / DAYS_PER_CENTURY;
        let nut = nutation(t);
        let moon = moon_ecliptic(t, &nut);
        let sun = sun_ecliptic(t, &nut);

        // Meeus 48.2 / 48.3
        let cos_psi = moon.lat.to_radians().cos() * (moon.lon - sun.lon).to_radians().cos();
        let psi = cos_psi.clamp(-1.0, 1.0).acos();
        let incidence = (sun.dist_km * psi.sin()).atan2(moon.dist_km - sun.dist_km * psi.cos());
        ensure_finite("illumination fraction", (1.0 + incidence.cos()) / 2.0)
    }

    fn search_rise_set(
        &self,
        observer: &Observer,
        start: &AstroTime,
        direction: Direction,
        window_days: f64,
        resolution_minutes: f64,
    ) -> Result<Option<AstroTime>, EphemerisError> {
        let step_days = resolution_minutes / 1_440.0;
        match direction {
            Direction::Rise => find_ascending_root("moonrise", start, window_days, step_days, |t| {
                limb_altitude(observer, t)
            }),
            Direction::Set => find_ascending_root("moonset", start, window_days, step_days, |t| {
                -limb_altitude(observer, t)
            }),
        }
    }

    fn search_transit(
        &self,
        observer: &Observer,
        start: &AstroTime,
        window_days: f64,
    ) -> Result<Option<AstroTime>, EphemerisError> {
        find_ascending_root("transit", start, window_days, TRANSIT_STEP_DAYS, |t| {
            topocentric(observer, t).hour_angle()
        })
    }

    fn search_moon_quarter(&self, start: &AstroTime) -> Result<MoonQuarter, EphemerisError> {
        let angle = ensure_finite("phase angle", elongation(start))?;
        let quarter = Quarter::from_index((angle / 90.0).floor() as usize + 1);
        let target = quarter.target_angle();

        let found = find_ascending_root(
            "moon quarter",
            start,
            QUARTER_SCAN_DAYS,
            QUARTER_STEP_DAYS,
            |t| normalize_to_pm180(elongation(t) - target),
        )?;

        found
            .map(|time| MoonQuarter { quarter, time })
            .ok_or(EphemerisError::NoConvergence {
                what: "moon quarter",
            })
    }

    fn next_moon_quarter(&self, previous: &MoonQuarter) -> Result<MoonQuarter, EphemerisError> {
        let start = previous.time.add_days(QUARTER_CHAIN_OFFSET_DAYS)?;
        let next = self.search_moon_quarter(&start)?;
        let expected = previous.quarter.next();
        if next.quarter != expected {
            return Err(EphemerisError::UnexpectedQuarter {
                expected,
                found: next.quarter,
            });
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> AstroTime {
        AstroTime::new(Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap())
    }

    fn paris() -> Observer {
        Observer {
            latitude: 48.8566,
            longitude: 2.3522,
            height_m: 0.0,
        }
    }

    fn minutes_between(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
        (a - b).num_minutes().abs()
    }

    #[test]
    fn moon_matches_meeus_example_47a() {
        // 1992-04-12 0h TD
        let t = (2_448_724.5 - 2_451_545.0) / DAYS_PER_CENTURY;
        let moon = moon_ecliptic(t, &nutation(t));
        assert!((moon.lon - 133.167_265).abs() < 0.01, "lon {}", moon.lon);
        assert!((moon.lat - -3.229_126).abs() < 0.01, "lat {}", moon.lat);
        assert!((moon.dist_km - 368_409.7).abs() < 10.0, "dist {}", moon.dist_km);
    }

    #[test]
    fn sun_matches_meeus_example_25a() {
        // 1992-10-13 0h TD
        let t = (2_448_908.5 - 2_451_545.0) / DAYS_PER_CENTURY;
        let sun = sun_ecliptic(t, &nutation(t));
        assert!((sun.lon - 199.909).abs() < 0.01, "lon {}", sun.lon);
        assert!((sun.dist_km / KM_PER_AU - 0.99766).abs() < 1e-4);
    }

    #[test]
    fn angle_normalization() {
        assert_eq!(normalize_degrees(-30.0), 330.0);
        assert_eq!(normalize_degrees(720.0), 0.0);
        assert_eq!(normalize_degrees(-1e-20), 0.0);
        assert_eq!(normalize_to_pm180(190.0), -170.0);
        assert_eq!(normalize_to_pm180(180.0), 180.0);
    }

    #[test]
    fn distance_stays_in_physical_range() {
        let eph = MeeusEphemeris::new();
        let mut time = at(2024, 1, 1, 0, 0);
        for _ in 0..60 {
            let km = eph.geo_vector(&time).unwrap().length() * KM_PER_AU;
            assert!((356_000.0..=407_000.0).contains(&km), "distance {km}");
            time = time.add_days(0.5).unwrap();
        }
    }

    #[test]
    fn quarters_match_published_times() {
        // USNO: new 2024-01-11 11:57, first 01-18 03:53, full 01-25 17:54, last 02-02 23:18
        let eph = MeeusEphemeris::new();
        let new = eph.search_moon_quarter(&at(2024, 1, 10, 0, 0)).unwrap();
        assert_eq!(new.quarter, Quarter::New);
        assert!(minutes_between(new.time.utc(), at(2024, 1, 11, 11, 57).utc()) < 30);

        let first = eph.next_moon_quarter(&new).unwrap();
        assert_eq!(first.quarter, Quarter::FirstQuarter);
        assert!(minutes_between(first.time.utc(), at(2024, 1, 18, 3, 53).utc()) < 30);

        let full = eph.next_moon_quarter(&first).unwrap();
        assert_eq!(full.quarter, Quarter::Full);
        assert!(minutes_between(full.time.utc(), at(2024, 1, 25, 17, 54).utc()) < 30);

        let last = eph.next_moon_quarter(&full).unwrap();
        assert_eq!(last.quarter, Quarter::LastQuarter);
        assert!(minutes_between(last.time.utc(), at(2024, 2, 2, 23, 18).utc()) < 30);
    }

    #[test]
    fn illumination_tracks_phase() {
        let eph = MeeusEphemeris::new();
        let full = eph.illumination_fraction(&at(2024, 1, 25, 17, 54)).unwrap();
        let new = eph.illumination_fraction(&at(2024, 1, 11, 11, 57)).unwrap();
        assert!(full > 0.99, "full moon illumination {full}");
        assert!(new < 0.01, "new moon illumination {new}");
    }

    #[test]
    fn rise_and_set_cross_the_horizon_in_the_right_direction() {
        let eph = MeeusEphemeris::new();
        let observer = paris();
        let start = at(2024, 3, 15, 0, 0);

        for direction in [Direction::Rise, Direction::Set] {
            let event = eph
                .search_rise_set(&observer, &start, direction, 2.0, 10.0)
                .unwrap()
                .expect("Paris sees the moon rise and set within two days");
            let before = limb_altitude(&observer, &event.add_days(-1.0 / 48.0).unwrap());
            let after = limb_altitude(&observer, &event.add_days(1.0 / 48.0).unwrap());
            assert!(limb_altitude(&observer, &event).abs() < 0.05);
            match direction {
                Direction::Rise => assert!(before < 0.0 && after > 0.0),
                Direction::Set => assert!(before > 0.0 && after < 0.0),
            }
        }
    }

    #[test]
    fn transit_points_due_south_from_paris() {
        let eph = MeeusEphemeris::new();
        let observer = paris();
        let start = at(2024, 3, 15, 0, 0);
        let transit = eph
            .search_transit(&observer, &start, 2.0)
            .unwrap()
            .expect("transit within two days");
        let eq = eph.equator(&observer, &transit).unwrap();
        let hor = eph.horizon(&observer, &transit, eq.ra, eq.dec).unwrap();
        assert!((hor.azimuth - 180.0).abs() < 0.5, "azimuth {}", hor.azimuth);
    }

    #[test]
    fn empty_window_finds_nothing() {
        let eph = MeeusEphemeris::new();
        let found = eph
            .search_rise_set(&paris(), &at(2024, 3, 15, 0, 0), Direction::Rise, 0.0, 10.0)
            .unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn refraction_lifts_low_objects_only() {
        assert!((refraction_degrees(0.0) - 0.48).abs() < 0.05);
        assert!(refraction_degrees(45.0) < 0.02);
        assert_eq!(refraction_degrees(-5.0), 0.0);
    }
}

use crate::config::{BucketingConfig, BucketingPolicy};
use crate::types::BucketKey;
use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeDelta};

/// タイムスタンプをバケットキーに割り当てる
///
/// 2つの方式をサポートする:
///
/// - **暦日**: タイムスタンプの日付部分がそのままキーになる。
///   入力順に依存しない。
/// - **ローリング固定幅**: 開始時刻 `start` から幅 `width` の期間毎に
///   0, 1, 2, ... のインデックスを振る。カーソル `(現在のキー, 現在の期間の終端)`
///   を持ち、タイムスタンプ昇順で呼び出す必要がある。
///
/// # Examples
///
/// ```
/// # use chat_stats::bucketer::Bucketer;
/// # use chat_stats::types::BucketKey;
/// # use chrono::{NaiveDate, TimeDelta};
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let mut bucketer = Bucketer::rolling(start, TimeDelta::days(7)).unwrap();
///
/// assert_eq!(bucketer.assign(start), BucketKey::Period(0));
/// // 3期間分の空白を越えても1回で正しいキーに到達する
/// let later = start + TimeDelta::days(22);
/// assert_eq!(bucketer.assign(later), BucketKey::Period(3));
/// ```
#[derive(Clone, Debug)]
pub enum Bucketer {
    CalendarDay,
    Rolling(RollingCursor),
}

/// ローリング期間のカーソル状態
#[derive(Clone, Debug)]
pub struct RollingCursor {
    start: NaiveDateTime,
    width: TimeDelta,
    current_key: u64,
    current_end: NaiveDateTime,
}

impl Bucketer {
    pub fn calendar_day() -> Self {
        Bucketer::CalendarDay
    }

    /// ローリング方式のバケッタを作成
    ///
    /// # Errors
    ///
    /// `width` が0以下、または `start + width` が表現できない場合にエラーを返す。
    pub fn rolling(start: NaiveDateTime, width: TimeDelta) -> Result<Self> {
        if width <= TimeDelta::zero() {
            anyhow::bail!("バケット幅は正である必要があります: {}", width);
        }
        let current_end = start
            .checked_add_signed(width)
            .with_context(|| format!("バケット終端の計算に失敗: {} + {}", start, width))?;

        Ok(Bucketer::Rolling(RollingCursor {
            start,
            width,
            current_key: 0,
            current_end,
        }))
    }

    /// 設定からバケッタを作成
    ///
    /// `start` はローリング方式の起点（ソート後の最初のメッセージ時刻）。
    pub fn from_config(config: &BucketingConfig, start: NaiveDateTime) -> Result<Self> {
        match config.policy {
            BucketingPolicy::CalendarDay => Ok(Self::calendar_day()),
            BucketingPolicy::Rolling => {
                Self::rolling(start, TimeDelta::days(i64::from(config.period_days)))
            }
        }
    }

    /// タイムスタンプにバケットキーを割り当てる
    ///
    /// ローリング方式では、`t` が現在の期間の終端以降である間、
    /// 期間を1幅ずつ進める。疎なデータで複数期間を飛び越える場合も
    /// ループで追いつくため、ラベルがずれることはない。
    /// カーソルは後退しないので、現在の期間より前の `t` には現在のキーを返す。
    pub fn assign(&mut self, timestamp: NaiveDateTime) -> BucketKey {
        match self {
            Bucketer::CalendarDay => BucketKey::Day(timestamp.date()),
            Bucketer::Rolling(cursor) => {
                while timestamp >= cursor.current_end {
                    match cursor.current_end.checked_add_signed(cursor.width) {
                        Some(next_end) => {
                            cursor.current_key += 1;
                            cursor.current_end = next_end;
                        }
                        None => break,
                    }
                }
                BucketKey::Period(cursor.current_key)
            }
        }
    }

    /// バケットの表示用ラベル（`YYYY-MM-DD`）
    ///
    /// ローリング方式では期間の開始日を返す。
    pub fn label(&self, key: &BucketKey) -> String {
        match (self, key) {
            (_, BucketKey::Day(date)) => date.format("%Y-%m-%d").to_string(),
            (Bucketer::Rolling(cursor), BucketKey::Period(index)) => cursor
                .period_start(*index)
                .map(|start| start.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| format!("period {}", index)),
            (Bucketer::CalendarDay, BucketKey::Period(index)) => format!("period {}", index),
        }
    }
}

impl RollingCursor {
    /// `index` 番目の期間の開始時刻
    fn period_start(&self, index: u64) -> Option<NaiveDateTime> {
        let index = i64::try_from(index).ok()?;
        let offset = self.width.num_seconds().checked_mul(index)?;
        let offset = TimeDelta::try_seconds(offset)?;
        self.start.checked_add_signed(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_calendar_day_assign() {
        let mut bucketer = Bucketer::calendar_day();
        let key = bucketer.assign(at(2024, 1, 1, 23));
        assert_eq!(
            key,
            BucketKey::Day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
        );
        assert_eq!(bucketer.label(&key), "2024-01-01");

        // 入力順に依存しない
        let later = bucketer.assign(at(2024, 3, 5, 0));
        let earlier = bucketer.assign(at(2023, 12, 31, 12));
        assert!(earlier < later);
    }

    #[test]
    fn test_assign_deterministic() {
        for width_days in [1, 2, 7, 30] {
            let start = at(2024, 1, 1, 10);
            let t = at(2024, 2, 14, 9);

            let mut a = Bucketer::rolling(start, TimeDelta::days(width_days)).unwrap();
            let mut b = Bucketer::rolling(start, TimeDelta::days(width_days)).unwrap();
            let first = a.assign(t);
            assert_eq!(first, a.assign(t));
            assert_eq!(first, b.assign(t));
        }

        let mut day = Bucketer::calendar_day();
        assert_eq!(day.assign(at(2024, 1, 1, 1)), day.assign(at(2024, 1, 1, 1)));
    }

    #[test]
    fn test_rolling_boundaries() {
        let start = at(2024, 1, 1, 10);
        let mut bucketer = Bucketer::rolling(start, TimeDelta::days(1)).unwrap();

        assert_eq!(bucketer.assign(start), BucketKey::Period(0));
        // 終端の直前は同じ期間
        assert_eq!(bucketer.assign(at(2024, 1, 2, 9)), BucketKey::Period(0));
        // 終端ちょうどは次の期間
        assert_eq!(bucketer.assign(at(2024, 1, 2, 10)), BucketKey::Period(1));
    }

    #[test]
    fn test_rolling_multi_period_gap() {
        let start = at(2024, 1, 1, 0);
        let mut bucketer = Bucketer::rolling(start, TimeDelta::days(30)).unwrap();

        assert_eq!(bucketer.assign(at(2024, 1, 15, 0)), BucketKey::Period(0));
        // 約5ヶ月の空白: 1期間ずつではなく一気に追いつく
        let key = bucketer.assign(at(2024, 6, 1, 0));
        assert_eq!(key, BucketKey::Period(5));
        assert_eq!(bucketer.label(&key), "2024-05-30");
        // その後の同一期間のメッセージも同じキー
        assert_eq!(bucketer.assign(at(2024, 6, 20, 0)), BucketKey::Period(5));
        assert_eq!(bucketer.assign(at(2024, 6, 29, 0)), BucketKey::Period(6));
    }

    #[test]
    fn test_rolling_labels() {
        let start = at(2024, 1, 1, 10);
        let bucketer = Bucketer::rolling(start, TimeDelta::days(7)).unwrap();
        assert_eq!(bucketer.label(&BucketKey::Period(0)), "2024-01-01");
        assert_eq!(bucketer.label(&BucketKey::Period(2)), "2024-01-15");
    }

    #[test]
    fn test_rolling_invalid_width() {
        let start = at(2024, 1, 1, 0);
        assert!(Bucketer::rolling(start, TimeDelta::zero()).is_err());
        assert!(Bucketer::rolling(start, TimeDelta::days(-1)).is_err());
    }

    #[test]
    fn test_from_config() {
        let start = at(2024, 1, 1, 0);
        let config = BucketingConfig {
            policy: BucketingPolicy::Rolling,
            period_days: 10,
        };
        let mut bucketer = Bucketer::from_config(&config, start).unwrap();
        assert_eq!(bucketer.assign(at(2024, 1, 25, 0)), BucketKey::Period(2));

        let config = BucketingConfig {
            policy: BucketingPolicy::CalendarDay,
            period_days: 10,
        };
        let mut bucketer = Bucketer::from_config(&config, start).unwrap();
        assert!(matches!(bucketer.assign(start), BucketKey::Day(_)));
    }
}

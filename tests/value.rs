#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use tabula::{AsValue, Error, Value};
    use time::{Date, Month, PrimitiveDateTime, Time};
    use uuid::Uuid;

    #[test]
    fn value_none() {
        assert_eq!(Value::Null, Value::Null);
        assert_ne!(Value::Float32(Some(1.0)), Value::Null);
        assert!(Value::Int32(None).is_null());
        assert!(Value::Int32(None).same_type(&Value::Int32(Some(1))));
        assert!(!Value::Int32(None).same_type(&Value::Int64(None)));
    }

    #[test]
    fn value_bool() {
        let val: Value = true.as_value();
        assert_eq!(val, Value::Boolean(Some(true)));
        assert_ne!(val, Value::Boolean(Some(false)));
        assert_ne!(val, Value::Varchar(Some("true".into())));
        assert_eq!(bool::try_from_value(val).unwrap(), true);
        assert_eq!(bool::try_from_value(8_i16.as_value()).unwrap(), true);
        assert_eq!(bool::try_from_value(0_i32.as_value()).unwrap(), false);
        assert_eq!(bool::try_from_value(2_i64.as_value()).unwrap(), true);
        assert!(bool::try_from_value(0.5_f32.as_value()).is_err());
    }

    #[test]
    fn value_integers() {
        assert_eq!(7_i16.as_value(), Value::Int16(Some(7)));
        assert_eq!(7_i32.as_value(), Value::Int32(Some(7)));
        assert_eq!(7_i64.as_value(), Value::Int64(Some(7)));
        assert_eq!(i64::try_from_value(Value::Int16(Some(-3))).unwrap(), -3);
        assert_eq!(i32::try_from_value(Value::Int64(Some(1 << 20))).unwrap(), 1 << 20);
        assert!(matches!(
            i16::try_from_value(Value::Int32(Some(70_000))),
            Err(Error::Conversion(..))
        ));
        assert_eq!(
            i32::try_from_value(Value::Decimal(Some(Decimal::from(12)))).unwrap(),
            12
        );
        assert!(i32::try_from_value(Value::Decimal(Some(Decimal::from_str("1.5").unwrap()))).is_err());
        assert!(i64::try_from_value(Value::Varchar(Some("12".into()))).is_err());
        assert_eq!(Value::Int64(Some(9)).as_integer(), Some(9));
        assert_eq!(Value::Float64(Some(9.0)).as_integer(), None);
    }

    #[test]
    fn value_floats() {
        assert_eq!(1.5_f32.as_value(), Value::Float32(Some(1.5)));
        assert_eq!(f64::try_from_value(Value::Float32(Some(0.25))).unwrap(), 0.25);
        assert_eq!(
            f64::try_from_value(Value::Decimal(Some(Decimal::from_str("2.5").unwrap()))).unwrap(),
            2.5
        );
        assert_eq!(
            Decimal::try_from_value(Value::Float64(Some(0.5))).unwrap(),
            Decimal::from_str("0.5").unwrap()
        );
        assert_eq!(Decimal::try_from_value(Value::Int32(Some(4))).unwrap(), Decimal::from(4));
    }

    #[test]
    fn value_strings() {
        assert_eq!(Value::from("Pythonistas"), Value::Varchar(Some("Pythonistas".into())));
        assert_eq!(
            String::try_from_value(Value::Json(Some(r#"{"a":1}"#.into()))).unwrap(),
            r#"{"a":1}"#
        );
        assert!(String::try_from_value(Value::Int32(Some(1))).is_err());
        assert_eq!(vec![1_u8, 2].as_value(), Value::Blob(Some([1, 2].into())));
    }

    #[test]
    fn value_time_and_uuid() {
        let date = Date::from_calendar_date(2025, Month::March, 14).unwrap();
        let time = Time::from_hms(15, 9, 26).unwrap();
        let timestamp = PrimitiveDateTime::new(date, time);
        assert_eq!(date.as_value(), Value::Date(Some(date)));
        let offset = time::OffsetDateTime::try_from_value(timestamp.as_value()).unwrap();
        assert_eq!(offset, timestamp.assume_utc());

        let id = Uuid::from_str("5e915574-bb30-4430-98cf-c5854f61fbbd").unwrap();
        assert_eq!(id.as_value(), Value::Uuid(Some(id)));
        assert_eq!(
            Uuid::try_from_value(Value::from("5e915574-bb30-4430-98cf-c5854f61fbbd")).unwrap(),
            id
        );
        assert!(matches!(
            Uuid::try_from_value(Value::from("not a uuid")),
            Err(Error::Conversion(..))
        ));
    }

    #[test]
    fn value_option() {
        assert_eq!(Some(3_i32).as_value(), Value::Int32(Some(3)));
        assert_eq!(None::<i32>.as_value(), Value::Int32(None));
        assert_eq!(Value::from(None::<String>), Value::Varchar(None));
        assert_eq!(Option::<i64>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::try_from_value(Value::Int64(None)).unwrap(), None);
        assert_eq!(Option::<i64>::try_from_value(Value::Int32(Some(5))).unwrap(), Some(5));
    }
}

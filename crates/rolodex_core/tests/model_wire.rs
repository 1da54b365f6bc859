use rolodex_core::{Address, Bookmark, Person, Pet, Sex};

#[test]
fn person_serialization_uses_expected_wire_fields() {
    let mut person = Person::new("HAL9000");
    person.id = Some(3);
    person.email = Some("hal@example.com".to_string());
    person.sex = Some(Sex::Male);
    person.birthday = Some(1_355_270_400_000);
    person.address = Some(Address {
        id: Some(1),
        city: "Paris".to_string(),
        street: "Rue de St. Denis".to_string(),
    });
    person.hobbies = vec!["Coding".to_string()];
    person.bookmarks = vec![Bookmark {
        id: Some(2),
        title: "Snoring for experts".to_string(),
        url: "http://www.hascode.com".to_string(),
    }];
    person.pets = vec![Pet {
        id: Some(4),
        name: "Nanny the bunny".to_string(),
        owners: vec![3],
    }];

    let json = serde_json::to_value(&person).unwrap();
    assert_eq!(json["id"], 3);
    assert_eq!(json["nickname"], "HAL9000");
    assert_eq!(json["sex"], "male");
    assert_eq!(json["birthday"], 1_355_270_400_000_i64);
    assert_eq!(json["address"]["city"], "Paris");
    assert_eq!(json["hobbies"][0], "Coding");
    assert_eq!(json["bookmarks"][0]["title"], "Snoring for experts");
    assert_eq!(json["pets"][0]["owners"][0], 3);

    let decoded: Person = serde_json::from_value(json).unwrap();
    assert_eq!(decoded, person);
}

#[test]
fn missing_collections_deserialize_as_empty() {
    let person: Person = serde_json::from_str(
        r#"{"id":null,"nickname":"Donald","email":null,"sex":null,"birthday":null,"address":null}"#,
    )
    .unwrap();
    assert_eq!(person, Person::new("Donald"));

    let pet: Pet = serde_json::from_str(r#"{"id":7,"name":"Doggie Dog"}"#).unwrap();
    assert!(pet.owners.is_empty());
}

#[test]
fn unknown_sex_is_rejected() {
    let err = serde_json::from_str::<Sex>(r#""unknown""#);
    assert!(err.is_err());
}
